//! Per-resend bookkeeping for a single `ResendRequest` in flight.

use fix_core::SeqNum;

/// State of one outstanding replay: `active` while records remain to be
/// coalesced or re-emitted, `drained` once `no_more_records` latches or
/// `last` reaches `end`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetransmissionState {
    Active,
    Drained,
}

/// Tracks one side of a `ResendRequest(begin, end)` as it is replayed.
///
/// `interrupted_seqnum` is the seqnum of the message that triggered the gap
/// in the first place (distinct from `begin`, the requested resend start) --
/// kept so a terminal gap-fill can be double-checked against what the peer
/// was actually blocked on.
#[derive(Clone, Copy, Debug)]
pub struct RetransmissionContext {
    begin: SeqNum,
    end: SeqNum,
    interrupted_seqnum: SeqNum,
    last: SeqNum,
    no_more_records: bool,
}

impl RetransmissionContext {
    /// `end == 0` means "through infinity"; callers should resolve it
    /// against the current high-water mark before constructing a context if
    /// they want a concrete upper bound, but `0` is preserved verbatim here
    /// since "infinity" can still grow while the context is active.
    pub fn new(begin: SeqNum, end: SeqNum, interrupted_seqnum: SeqNum) -> RetransmissionContext {
        RetransmissionContext {
            begin,
            end,
            interrupted_seqnum,
            last: begin - 1,
            no_more_records: false,
        }
    }

    pub fn begin(&self) -> SeqNum {
        self.begin
    }

    pub fn end(&self) -> SeqNum {
        self.end
    }

    pub fn interrupted_seqnum(&self) -> SeqNum {
        self.interrupted_seqnum
    }

    pub fn last(&self) -> SeqNum {
        self.last
    }

    pub fn state(&self) -> RetransmissionState {
        if self.is_drained() {
            RetransmissionState::Drained
        } else {
            RetransmissionState::Active
        }
    }

    pub fn is_drained(&self) -> bool {
        self.no_more_records || (self.end != 0 && self.last >= self.end)
    }

    /// Advances `last` to `seqnum`. Panics if this would move `last`
    /// backwards -- the replay loop must deliver records in ascending order.
    pub fn advance_to(&mut self, seqnum: SeqNum) {
        assert!(
            seqnum >= self.last,
            "retransmission last must be non-decreasing"
        );
        self.last = seqnum;
    }

    pub fn mark_no_more_records(&mut self) {
        self.no_more_records = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_when_last_reaches_end() {
        let mut ctx = RetransmissionContext::new(5, 10, 5);
        assert_eq!(ctx.state(), RetransmissionState::Active);
        ctx.advance_to(10);
        assert_eq!(ctx.state(), RetransmissionState::Drained);
    }

    #[test]
    fn infinite_end_never_drains_from_last_alone() {
        let mut ctx = RetransmissionContext::new(5, 0, 5);
        ctx.advance_to(1_000_000);
        assert_eq!(ctx.state(), RetransmissionState::Active);
        ctx.mark_no_more_records();
        assert_eq!(ctx.state(), RetransmissionState::Drained);
    }

    #[test]
    #[should_panic(expected = "non-decreasing")]
    fn advance_to_rejects_backwards_motion() {
        let mut ctx = RetransmissionContext::new(5, 10, 5);
        ctx.advance_to(7);
        ctx.advance_to(6);
    }
}
