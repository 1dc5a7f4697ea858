//! The `Message` shape the session core operates on, plus the `Codec` and
//! `Metadata` collaborator traits.
//!
//! Wire framing (tag=value/SOH, checksum, body length) and the FIX
//! dictionary (which tags belong to which message, which are required) are
//! explicitly out of scope for this crate -- they are supplied by whatever
//! implements `Codec` and `Metadata`. What lives here is the minimal,
//! codec-agnostic in-memory representation those collaborators hand back
//! and forth with the session core: standard header fields the core itself
//! must stamp plus an opaque tag/value body.

use std::collections::BTreeMap;

use fix_core::{FixString, MsgType, SeqNum, TagNum, UtcTimestamp};

/// Standard FIX header fields the session core reads or stamps directly.
/// Everything dictionary-specific (custom header extensions, `ApplVerID`,
/// and so on) lives in `Message::fields` instead.
#[derive(Clone, Debug)]
pub struct Header {
    pub begin_string: FixString,
    pub msg_type: MsgType,
    pub msg_seq_num: SeqNum,
    pub sender_comp_id: FixString,
    pub target_comp_id: FixString,
    pub sending_time: UtcTimestamp,
    pub orig_sending_time: Option<UtcTimestamp>,
    pub poss_dup_flag: Option<bool>,
}

impl Header {
    pub fn new(msg_type: MsgType) -> Header {
        Header {
            begin_string: FixString::new(),
            msg_type,
            msg_seq_num: 0,
            sender_comp_id: FixString::new(),
            target_comp_id: FixString::new(),
            sending_time: UtcTimestamp::MIN_UTC,
            orig_sending_time: None,
            poss_dup_flag: None,
        }
    }
}

/// A decoded (inbound) or to-be-encoded (outbound) FIX message.
///
/// Body fields are opaque tag/value pairs: this crate does not know which
/// tags a given `MsgType` requires, that is the Metadata collaborator's
/// job. Admin messages the session core itself generates (Logon, Logout,
/// Heartbeat, TestRequest, ResendRequest, SequenceReset, Reject) use the
/// small set of well-known tag numbers documented on the constructors in
/// `crate::admin`.
#[derive(Clone, Debug)]
pub struct Message {
    pub header: Header,
    pub fields: BTreeMap<TagNum, String>,
}

impl Message {
    pub fn new(msg_type: MsgType) -> Message {
        Message {
            header: Header::new(msg_type),
            fields: BTreeMap::new(),
        }
    }

    pub fn seqnum(&self) -> SeqNum {
        self.header.msg_seq_num
    }

    pub fn msg_type(&self) -> &MsgType {
        &self.header.msg_type
    }

    pub fn poss_dup_flag(&self) -> bool {
        self.header.poss_dup_flag.unwrap_or(false)
    }

    pub fn field(&self, tag: TagNum) -> Option<&str> {
        self.fields.get(&tag).map(String::as_str)
    }

    pub fn set_field(&mut self, tag: TagNum, value: impl Into<String>) -> &mut Message {
        self.fields.insert(tag, value.into());
        self
    }
}

/// Failure to decode a raw frame into a [`Message`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not well-formed FIX (bad checksum, truncated, SOH
    /// missing, ...). There is no recoverable seqnum to reject against.
    #[error("garbled message: {0}")]
    Garbled(String),
    /// The frame parsed far enough to recover a seqnum and msg type but
    /// failed dictionary validation (missing required tag, etc); the
    /// session can emit a Reject<3> referencing `seqnum`.
    #[error("rejected message (seqnum={seqnum}): {reason}")]
    Reject { seqnum: SeqNum, reason: String },
}

/// Failure to construct a [`Message`] of an unrecognized `MsgType` via
/// [`Metadata::create`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown message type: {0}")]
pub struct UnknownType(pub String);

/// Parses raw frames into [`Message`]s and serializes them back to bytes.
/// Wire framing (SOH, `BodyLength<9>`, `CheckSum<10>`) is entirely this
/// collaborator's concern; the session core never touches raw bytes other
/// than to hand them to `decode` or receive them from `encode`.
pub trait Codec {
    fn decode(&self, frame: &[u8]) -> Result<Message, DecodeError>;
    fn encode(&self, message: &Message) -> Vec<u8>;
}

/// Knows the FIX dictionary: which message types exist and what a blank
/// instance of each looks like.
pub trait Metadata {
    fn create(&self, msg_type: &MsgType) -> Result<Message, UnknownType>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_fields_are_opaque_tag_value_pairs() {
        let mut msg = Message::new(MsgType::Logon);
        msg.set_field(108, "30");
        assert_eq!(msg.field(108), Some("30"));
        assert_eq!(msg.field(999), None);
    }
}
