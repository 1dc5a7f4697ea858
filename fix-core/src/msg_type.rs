use std::fmt;

use crate::fields::FixString;

/// Administrative vs. application message category.
///
/// Dispatch is a match on a closed set of admin kinds plus a catch-all for
/// everything else, rather than a string lookup keyed on the raw
/// `MsgType<35>` value on every inbound message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MsgCat {
    Admin,
    App,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum MsgType {
    Logon,
    Logout,
    Heartbeat,
    TestRequest,
    ResendRequest,
    SequenceReset,
    Reject,
    /// Any `MsgType<35>` value not recognized as an admin message. The raw
    /// value is kept for echoing it back in Reject<3>'s `RefMsgType<372>`.
    Application(FixString),
}

impl MsgType {
    pub fn category(&self) -> MsgCat {
        match self {
            MsgType::Application(_) => MsgCat::App,
            _ => MsgCat::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.category() == MsgCat::Admin
    }

    /// The wire value of `MsgType<35>` for this variant, per FIX 4.2+.
    pub fn as_fix_str(&self) -> &str {
        match self {
            MsgType::Heartbeat => "0",
            MsgType::TestRequest => "1",
            MsgType::ResendRequest => "2",
            MsgType::Reject => "3",
            MsgType::SequenceReset => "4",
            MsgType::Logout => "5",
            MsgType::Logon => "A",
            MsgType::Application(raw) => raw.as_utf8(),
        }
    }

    pub fn from_fix_str(value: &str) -> MsgType {
        match value {
            "0" => MsgType::Heartbeat,
            "1" => MsgType::TestRequest,
            "2" => MsgType::ResendRequest,
            "3" => MsgType::Reject,
            "4" => MsgType::SequenceReset,
            "5" => MsgType::Logout,
            "A" => MsgType::Logon,
            other => MsgType::Application(FixString::from(other)),
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_fix_str())
    }
}
