//! The `ApplicationHook` collaborator: business logic injected into the
//! session core rather than reached via virtual dispatch.
//!
//! One trait with default implementations stands in for what would otherwise
//! be a deep hierarchy of overridable methods (`handle_logon`, `authenticate`,
//! `modify_outbound`, ...) on a subclassed session: a caller who only cares
//! about application messages overrides `on_application` and leaves
//! everything else at its default.

use fix_core::MsgType;

use crate::message::Message;
use crate::session_id::SessionId;

/// Business-logic callbacks the session core invokes at well-defined
/// points in the ingress/egress pipelines. All methods have a default that
/// preserves the most permissive behavior, so implementors only override
/// what they need.
pub trait ApplicationHook {
    /// An application (non-admin) message arrived in sequence. Returning
    /// `false` tells the core to emit a session-level Reject for this
    /// seqnum and withhold advancing the receive cursor.
    fn on_application(&mut self, seqnum: fix_core::SeqNum, message: &Message) -> bool {
        let _ = (seqnum, message);
        true
    }

    /// An admin message was applied. This is an observation point, not a
    /// gate: its return value does not affect state transitions. In
    /// particular a `Reject<3>` is always reported here, never suppressed.
    fn on_admin(&mut self, msg_type: &MsgType, message: &Message) {
        let _ = (msg_type, message);
    }

    /// Acceptor-only: decide whether to accept an inbound Logon for `sid`.
    /// Defaults to accepting everyone, which is appropriate for tests and
    /// for deployments that authenticate at the transport layer instead.
    fn authenticate(&mut self, sid: &SessionId, logon: &Message) -> bool {
        let _ = (sid, logon);
        true
    }

    /// Last chance to mutate an outbound message before it is stamped with
    /// a sequence number and serialized. Defaults to a no-op.
    fn modify_outbound(&mut self, message: &mut Message) {
        let _ = message;
    }
}

/// An `ApplicationHook` that accepts everything and does nothing --
/// sufficient for tests and for acceptors that only need the session-layer
/// protocol with no business logic attached.
#[derive(Debug, Default)]
pub struct NullApplicationHook;

impl ApplicationHook for NullApplicationHook {}
