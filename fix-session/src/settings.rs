//! Configuration types. Deserializable with `serde` so a host application
//! can load them from TOML/JSON/etc.; this crate never parses a config file
//! itself.

#[cfg(any(feature = "serde-serialize", feature = "serde-deserialize"))]
use serde::{Deserialize, Serialize};

/// Per-session tunables: heartbeat cadence, comp-id/latency enforcement,
/// and the reset-on-{logon,logout,disconnect} policy knobs.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize))]
#[cfg_attr(feature = "serde-deserialize", derive(Deserialize))]
#[cfg_attr(
    any(feature = "serde-serialize", feature = "serde-deserialize"),
    serde(default)
)]
pub struct SessionSettings {
    pub heartbeat_interval_seconds: u32,
    /// Whether `enforce` checks `SenderCompID`/`TargetCompID` against the
    /// configured `SessionId` (disable only for transports that already
    /// guarantee identity, e.g. a dedicated TLS client cert per session).
    pub check_comp_id: bool,
    /// Reject inbound messages whose `SendingTime` drifts from local time
    /// by more than `max_latency_seconds`.
    pub check_latency: bool,
    pub max_latency_seconds: u32,
    pub reset_on_logon: bool,
    pub reset_on_logout: bool,
    pub reset_on_disconnect: bool,
    /// Require an inbound Logon within this many seconds of accepting the
    /// transport connection, else disconnect.
    pub logon_timeout_seconds: u32,
    /// Send an explicit Logout (rather than a bare disconnect) when the
    /// peer's Logout arrives without one pending locally.
    pub verify_logout: bool,
}

impl Default for SessionSettings {
    fn default() -> SessionSettings {
        SessionSettings {
            heartbeat_interval_seconds: 30,
            check_comp_id: true,
            check_latency: false,
            max_latency_seconds: 120,
            reset_on_logon: false,
            reset_on_logout: false,
            reset_on_disconnect: false,
            logon_timeout_seconds: 10,
            verify_logout: true,
        }
    }
}

/// Retry/reset policy bundled together, mirroring fix8's
/// `set_login_parameters`/`get_login_parameters` pairing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize))]
#[cfg_attr(feature = "serde-deserialize", derive(Deserialize))]
pub struct LoginParameters {
    pub retry_interval_ms: u64,
    pub max_retries: u32,
    pub reset_sequence_numbers: bool,
    pub heartbeat_interval_seconds: u32,
}

impl Default for LoginParameters {
    fn default() -> LoginParameters {
        LoginParameters {
            retry_interval_ms: 5_000,
            max_retries: 3,
            reset_sequence_numbers: false,
            heartbeat_interval_seconds: 30,
        }
    }
}

/// Top-level settings covering everything a host application needs to bring
/// up one session. A deployment running many sessions typically keys a map
/// of these by `SessionId`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize))]
#[cfg_attr(feature = "serde-deserialize", derive(Deserialize))]
pub struct Settings {
    pub session: SessionSettings,
    pub login: LoginParameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_internally_consistent() {
        let settings = Settings::default();
        assert_eq!(settings.session.heartbeat_interval_seconds, 30);
        assert_eq!(settings.login.heartbeat_interval_seconds, 30);
        assert!(settings.session.check_comp_id);
    }
}
