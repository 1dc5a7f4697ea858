//! Constructors for the seven administrative message types the session core
//! generates itself: `Logon`, `Logout`, `Heartbeat`, `TestRequest`,
//! `ResendRequest`, `SequenceReset`, `Reject`.
//!
//! Tag numbers below are the standard FIX 4.2+ admin tags; they are stable
//! across dictionary versions so the core can stamp them directly without
//! asking the Metadata collaborator.

use fix_core::{FixString, MsgType, SeqNum};

use crate::message::Message;

pub(crate) mod tags {
    use fix_core::TagNum;

    pub const ENCRYPT_METHOD: TagNum = 98;
    pub const HEART_BT_INT: TagNum = 108;
    pub const RESET_SEQ_NUM_FLAG: TagNum = 141;
    pub const TEST_REQ_ID: TagNum = 112;
    pub const BEGIN_SEQ_NO: TagNum = 7;
    pub const END_SEQ_NO: TagNum = 16;
    pub const NEW_SEQ_NO: TagNum = 36;
    pub const GAP_FILL_FLAG: TagNum = 123;
    pub const TEXT: TagNum = 58;
    pub const REF_SEQ_NUM: TagNum = 45;
    pub const REF_TAG_ID: TagNum = 371;
    pub const REF_MSG_TYPE: TagNum = 372;
    pub const SESSION_REJECT_REASON: TagNum = 373;
}

/// `SessionRejectReason<373>` enumeration used on `Reject<3>` messages.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionRejectReason {
    InvalidTagNumber,
    RequiredTagMissing,
    TagNotDefinedForMessageType,
    UndefinedTag,
    TagSpecifiedWithoutAValue,
    ValueIncorrectForTag,
    IncorrectDataFormatForValue,
    CompIdProblem,
    SendingTimeAccuracyProblem,
    InvalidMsgType,
    Other,
}

impl SessionRejectReason {
    pub fn code(self) -> i32 {
        match self {
            SessionRejectReason::InvalidTagNumber => 0,
            SessionRejectReason::RequiredTagMissing => 1,
            SessionRejectReason::TagNotDefinedForMessageType => 2,
            SessionRejectReason::UndefinedTag => 3,
            SessionRejectReason::TagSpecifiedWithoutAValue => 4,
            SessionRejectReason::ValueIncorrectForTag => 5,
            SessionRejectReason::IncorrectDataFormatForValue => 6,
            SessionRejectReason::CompIdProblem => 9,
            SessionRejectReason::SendingTimeAccuracyProblem => 10,
            SessionRejectReason::InvalidMsgType => 11,
            SessionRejectReason::Other => 99,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            SessionRejectReason::InvalidTagNumber => "Invalid tag number",
            SessionRejectReason::RequiredTagMissing => "Required tag missing",
            SessionRejectReason::TagNotDefinedForMessageType => {
                "Tag not defined for this message type"
            }
            SessionRejectReason::UndefinedTag => "Undefined tag",
            SessionRejectReason::TagSpecifiedWithoutAValue => "Tag specified without a value",
            SessionRejectReason::ValueIncorrectForTag => "Value is incorrect for this tag",
            SessionRejectReason::IncorrectDataFormatForValue => {
                "Incorrect data format for value"
            }
            SessionRejectReason::CompIdProblem => "CompID problem",
            SessionRejectReason::SendingTimeAccuracyProblem => "SendingTime accuracy problem",
            SessionRejectReason::InvalidMsgType => "Invalid MsgType",
            SessionRejectReason::Other => "Other",
        }
    }
}

pub fn logon(heart_bt_int: i32, reset_seq_num_flag: bool) -> Message {
    let mut msg = Message::new(MsgType::Logon);
    msg.set_field(tags::ENCRYPT_METHOD, "0");
    msg.set_field(tags::HEART_BT_INT, heart_bt_int.to_string());
    if reset_seq_num_flag {
        msg.set_field(tags::RESET_SEQ_NUM_FLAG, "Y");
    }
    msg
}

pub fn logout(text: Option<&FixString>) -> Message {
    let mut msg = Message::new(MsgType::Logout);
    if let Some(text) = text {
        msg.set_field(tags::TEXT, text.as_utf8().to_owned());
    }
    msg
}

pub fn heartbeat(test_req_id: Option<&FixString>) -> Message {
    let mut msg = Message::new(MsgType::Heartbeat);
    if let Some(id) = test_req_id {
        msg.set_field(tags::TEST_REQ_ID, id.as_utf8().to_owned());
    }
    msg
}

pub fn test_request(test_req_id: &FixString) -> Message {
    let mut msg = Message::new(MsgType::TestRequest);
    msg.set_field(tags::TEST_REQ_ID, test_req_id.as_utf8().to_owned());
    msg
}

/// `EndSeqNo<16> = 0` means "through infinity".
pub fn resend_request(begin_seq_no: SeqNum, end_seq_no: SeqNum) -> Message {
    let mut msg = Message::new(MsgType::ResendRequest);
    msg.set_field(tags::BEGIN_SEQ_NO, begin_seq_no.to_string());
    msg.set_field(tags::END_SEQ_NO, end_seq_no.to_string());
    msg
}

pub fn sequence_reset(new_seq_no: SeqNum, gap_fill: bool) -> Message {
    let mut msg = Message::new(MsgType::SequenceReset);
    msg.set_field(tags::NEW_SEQ_NO, new_seq_no.to_string());
    msg.set_field(tags::GAP_FILL_FLAG, if gap_fill { "Y" } else { "N" });
    msg
}

pub fn reject(
    ref_seq_num: SeqNum,
    ref_msg_type: &MsgType,
    reason: SessionRejectReason,
    ref_tag_id: Option<u32>,
    text: Option<&str>,
) -> Message {
    let mut msg = Message::new(MsgType::Reject);
    msg.set_field(tags::REF_SEQ_NUM, ref_seq_num.to_string());
    msg.set_field(tags::REF_MSG_TYPE, ref_msg_type.as_fix_str().to_owned());
    msg.set_field(tags::SESSION_REJECT_REASON, reason.code().to_string());
    if let Some(tag) = ref_tag_id {
        msg.set_field(tags::REF_TAG_ID, tag.to_string());
    }
    msg.set_field(tags::TEXT, text.unwrap_or(reason.text()).to_owned());
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logon_sets_reset_flag_only_when_requested() {
        let with_reset = logon(30, true);
        assert_eq!(with_reset.field(tags::RESET_SEQ_NUM_FLAG), Some("Y"));

        let without_reset = logon(30, false);
        assert_eq!(without_reset.field(tags::RESET_SEQ_NUM_FLAG), None);
    }

    #[test]
    fn resend_request_end_seq_no_zero_means_infinity() {
        let msg = resend_request(5, 0);
        assert_eq!(msg.field(tags::BEGIN_SEQ_NO), Some("5"));
        assert_eq!(msg.field(tags::END_SEQ_NO), Some("0"));
    }

    #[test]
    fn reject_defaults_text_to_reason() {
        let msg = reject(7, &MsgType::Logon, SessionRejectReason::CompIdProblem, None, None);
        assert_eq!(msg.field(tags::TEXT), Some("CompID problem"));
    }
}
