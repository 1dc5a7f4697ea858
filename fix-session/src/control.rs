//! Lifecycle signals for a single session: `{shutdown, print, debug}`.
//!
//! `ControlFlags` is owned by exactly one session and never registered in a
//! process-wide table, so reading or latching a bit never requires finding
//! the session first.

use std::sync::atomic::{AtomicU8, Ordering};

const SHUTDOWN: u8 = 1 << 0;
const PRINT: u8 = 1 << 1;
const DEBUG: u8 = 1 << 2;

/// Atomic bitset over `{shutdown, print, debug}`, readable and writable from
/// any task without taking the session's `RefCell` borrow.
#[derive(Debug, Default)]
pub struct ControlFlags(AtomicU8);

impl ControlFlags {
    pub const fn new() -> ControlFlags {
        ControlFlags(AtomicU8::new(0))
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::Acquire) & SHUTDOWN != 0
    }

    pub fn set_shutdown(&self) {
        self.0.fetch_or(SHUTDOWN, Ordering::AcqRel);
    }

    pub fn is_print(&self) -> bool {
        self.0.load(Ordering::Acquire) & PRINT != 0
    }

    pub fn set_print(&self, enable: bool) {
        self.set_bit(PRINT, enable);
    }

    pub fn is_debug(&self) -> bool {
        self.0.load(Ordering::Acquire) & DEBUG != 0
    }

    pub fn set_debug(&self, enable: bool) {
        self.set_bit(DEBUG, enable);
    }

    fn set_bit(&self, bit: u8, enable: bool) {
        if enable {
            self.0.fetch_or(bit, Ordering::AcqRel);
        } else {
            self.0.fetch_and(!bit, Ordering::AcqRel);
        }
    }
}
