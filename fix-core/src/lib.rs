//! Minimal FIX field vocabulary shared between the session engine and its
//! codec/metadata collaborators.
//!
//! This crate deliberately does not know how to parse or serialize a FIX
//! frame, nor does it carry a message dictionary: those belong to a Codec
//! and a Metadata collaborator that live outside this workspace. What it
//! provides is the small set of strongly-typed values the session core
//! needs to talk *about* messages without depending on any particular wire
//! format.

pub mod fields;
pub mod msg_type;
pub mod timestamp;

pub use fields::{FixStr, FixString, SeqNum, TagNum};
pub use msg_type::{MsgCat, MsgType};
pub use timestamp::UtcTimestamp;
