//! The `Connection` collaborator: frame-level transport, independent of
//! what carries the bytes (TCP, TLS, an in-memory channel for tests).

use std::fmt;

/// Reported by [`Connection::read`] when the peer has closed the transport.
#[derive(Debug)]
pub struct Disconnected;

impl fmt::Display for Disconnected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection closed by peer")
    }
}

impl std::error::Error for Disconnected {}

/// Failure writing a frame to the transport.
#[derive(Debug)]
pub struct WriteError(pub Box<dyn std::error::Error + Send + Sync>);

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write failed: {}", self.0)
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Delivers inbound frames to the session and accepts outbound frames.
///
/// Each `read` call must return exactly one complete FIX frame -- framing
/// (finding the SOH-delimited `CheckSum<10>` that terminates a message) is
/// this collaborator's job, same as the `Codec`'s encode/decode split is
/// about field semantics rather than message boundaries.
pub trait Connection {
    fn read(&mut self) -> impl Future<Output = Result<Vec<u8>, Disconnected>> + Send;

    fn write(&mut self, frame: &[u8]) -> impl Future<Output = Result<(), WriteError>> + Send;
}


#[cfg(test)]
mod tests {
    use super::test_support::ChannelConnection;
    use super::*;

    #[tokio::test]
    async fn read_returns_disconnected_once_queue_is_empty() {
        let mut conn = ChannelConnection::new();
        conn.push_inbound(b"8=FIX.4.4|".to_vec());
        assert_eq!(conn.read().await.unwrap(), b"8=FIX.4.4|".to_vec());
        assert!(conn.read().await.is_err());
    }

    #[tokio::test]
    async fn write_appends_to_outbound() {
        let mut conn = ChannelConnection::new();
        conn.write(b"frame").await.unwrap();
        assert_eq!(conn.outbound, vec![b"frame".to_vec()]);
    }
}
