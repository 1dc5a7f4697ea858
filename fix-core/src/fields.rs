use std::{borrow::Borrow, fmt, ops::Deref};

#[cfg(feature = "serde-serialize")]
use serde::Serialize;
#[cfg(feature = "serde-deserialize")]
use serde::Deserialize;

/// `MsgSeqNum<34>` and friends. FIX sequence numbers are 1-based and never
/// negative; `i64` leaves headroom well past any realistic session lifetime.
pub type SeqNum = i64;

/// A FIX tag number, e.g. `52` for `SendingTime`.
pub type TagNum = u32;

/// Borrowed FIX string field, analogous to `str`.
///
/// FIX values are ASCII/Latin-1 tag=value pairs; we store them as UTF-8 but
/// never assume non-ASCII content round-trips through a real wire codec.
#[derive(Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct FixStr(str);

impl FixStr {
    pub fn as_utf8(&self) -> &str {
        &self.0
    }

    fn from_str(s: &str) -> &FixStr {
        // SAFETY: `FixStr` is `#[repr(transparent)]` over `str`.
        unsafe { &*(s as *const str as *const FixStr) }
    }
}

impl fmt::Display for FixStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FixStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

/// Owned FIX string field.
#[derive(Clone, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize))]
#[cfg_attr(feature = "serde-deserialize", derive(Deserialize))]
#[cfg_attr(
    any(feature = "serde-serialize", feature = "serde-deserialize"),
    serde(transparent)
)]
pub struct FixString(String);

impl FixString {
    pub const fn new() -> FixString {
        FixString(String::new())
    }

    pub fn from_ascii_lossy(bytes: Vec<u8>) -> FixString {
        FixString(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn as_utf8(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FixString {
    fn from(s: &str) -> FixString {
        FixString(s.to_owned())
    }
}

impl From<String> for FixString {
    fn from(s: String) -> FixString {
        FixString(s)
    }
}

impl From<&FixStr> for FixString {
    fn from(s: &FixStr) -> FixString {
        FixString(s.0.to_owned())
    }
}

impl Deref for FixString {
    type Target = FixStr;

    fn deref(&self) -> &FixStr {
        FixStr::from_str(&self.0)
    }
}

impl Borrow<FixStr> for FixString {
    fn borrow(&self) -> &FixStr {
        FixStr::from_str(&self.0)
    }
}

impl AsRef<FixStr> for FixString {
    fn as_ref(&self) -> &FixStr {
        FixStr::from_str(&self.0)
    }
}

impl PartialEq<FixStr> for FixString {
    fn eq(&self, other: &FixStr) -> bool {
        self.0 == other.0
    }
}

impl PartialEq<FixString> for FixStr {
    fn eq(&self, other: &FixString) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for FixString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FixString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}
