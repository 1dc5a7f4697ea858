//! `SessionState` and the sequence/timestamp bookkeeping a session carries
//! alongside it.

use std::fmt;

/// Where a session sits in the logon/established/logoff lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Continuous,
    SessionTerminated,
    WaitForLogon,
    NotLoggedIn,
    LogonSent,
    LogonReceived,
    LogoffSent,
    LogoffReceived,
    TestRequestSent,
    SequenceResetSent,
    SequenceResetReceived,
    ResendRequestSent,
    ResendRequestReceived,
}

impl SessionState {
    /// A state is established iff it is not one of the three pre-handshake
    /// states. Only established sessions accept non-logon traffic.
    pub fn is_established(self) -> bool {
        !matches!(
            self,
            SessionState::WaitForLogon | SessionState::NotLoggedIn | SessionState::LogonSent
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::SessionTerminated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Continuous => "continuous",
            SessionState::SessionTerminated => "session_terminated",
            SessionState::WaitForLogon => "wait_for_logon",
            SessionState::NotLoggedIn => "not_logged_in",
            SessionState::LogonSent => "logon_sent",
            SessionState::LogonReceived => "logon_received",
            SessionState::LogoffSent => "logoff_sent",
            SessionState::LogoffReceived => "logoff_received",
            SessionState::TestRequestSent => "test_request_sent",
            SessionState::SequenceResetSent => "sequence_reset_sent",
            SessionState::SequenceResetReceived => "sequence_reset_received",
            SessionState::ResendRequestSent => "resend_request_sent",
            SessionState::ResendRequestReceived => "resend_request_received",
        };
        f.write_str(name)
    }
}

use fix_core::SeqNum;

/// The two monotonic counters that order a session's bidirectional stream.
///
/// Both start at 1. `next_send_seq` advances on every successful send unless
/// the caller asked for `no_increment` (gap-fill fabrication);
/// `next_receive_seq` advances only when an inbound message arrives with
/// `seqnum == next_receive_seq`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SequenceCursor {
    next_send_seq: SeqNum,
    next_receive_seq: SeqNum,
}

impl SequenceCursor {
    pub fn new() -> SequenceCursor {
        SequenceCursor {
            next_send_seq: 1,
            next_receive_seq: 1,
        }
    }

    pub fn with_start(next_send_seq: SeqNum, next_receive_seq: SeqNum) -> SequenceCursor {
        SequenceCursor {
            next_send_seq,
            next_receive_seq,
        }
    }

    pub fn next_send_seq(&self) -> SeqNum {
        self.next_send_seq
    }

    pub fn next_receive_seq(&self) -> SeqNum {
        self.next_receive_seq
    }

    /// Consumes the current `next_send_seq` as the seqnum for a just-sent
    /// message and advances it, unless `no_increment` is set (used when
    /// fabricating a gap-fill that must not itself consume a slot).
    pub fn advance_send(&mut self, no_increment: bool) -> SeqNum {
        let seq = self.next_send_seq;
        if !no_increment {
            self.next_send_seq += 1;
        }
        seq
    }

    /// Advances the receive cursor past a message just applied at
    /// `next_receive_seq`. Caller must have already checked `seqnum ==
    /// next_receive_seq()`.
    pub fn advance_receive(&mut self) {
        self.next_receive_seq += 1;
    }

    pub fn reset(&mut self) {
        self.next_send_seq = 1;
        self.next_receive_seq = 1;
    }

    pub fn set_next_send_seq(&mut self, seq: SeqNum) {
        self.next_send_seq = seq;
    }

    pub fn set_next_receive_seq(&mut self, seq: SeqNum) {
        self.next_receive_seq = seq;
    }
}

impl Default for SequenceCursor {
    fn default() -> SequenceCursor {
        SequenceCursor::new()
    }
}
