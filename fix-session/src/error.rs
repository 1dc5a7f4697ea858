//! Error hierarchy for the session pipeline.

use fix_core::SeqNum;

use crate::message::{DecodeError, UnknownType};
use crate::session_id::SessionId;

/// What went wrong processing or producing a single message, and what the
/// pipeline should do about it.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("compid mismatch on session {session}")]
    CompIdMismatch { session: SessionId },

    #[error("sequence too low: got {got}, expected {expected} (no PossDup)")]
    SequenceTooLow { got: SeqNum, expected: SeqNum },

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("cannot build outbound message: {0}")]
    InvalidMetadata(#[from] UnknownType),

    #[error("persist failed: {0}")]
    Persist(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("connection failed: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("logon timed out after {retries} retries")]
    LogonTimeout { retries: u32 },

    #[error("authentication failed for session {session}")]
    AuthFailure { session: SessionId },

    #[error("session is not established")]
    NotEstablished,

    #[error("peer unresponsive after test request, terminating session")]
    DeadPeer,
}

impl SessionError {
    /// Whether this error should unwind the whole session (`stop()`) rather
    /// than being handled inline by the ingress pipeline.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::CompIdMismatch { .. }
                | SessionError::SequenceTooLow { .. }
                | SessionError::Connection(_)
                | SessionError::AuthFailure { .. }
                | SessionError::DeadPeer
        )
    }
}

/// Failure reported by [`crate::acceptor::accept`]/[`crate::initiator::connect`]
/// while bringing up a session.
#[derive(Debug, thiserror::Error)]
pub enum AcceptorError {
    #[error("no session configured for incoming connection")]
    UnknownSession,
    #[error(transparent)]
    Session(#[from] SessionError),
}
