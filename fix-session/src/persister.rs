//! Durable store for outbound messages and sequence cursors: point lookup,
//! ascending range scan, and cursor upsert/read keyed by direction.

use std::{collections::BTreeMap, convert::Infallible, ops::RangeInclusive};

use fix_core::SeqNum;

/// Which direction a sequence cursor belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Send,
    Recv,
}

/// A single persisted outbound message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PersistedRecord {
    pub seqnum: SeqNum,
    pub frame: Vec<u8>,
}

/// Durable store for `(seqnum -> raw outbound frame)` and
/// `(direction -> next sequence)` cursors.
///
/// A `put` must be observable after a process restart; this crate does not
/// mandate a schema, only the operations below.
pub trait Persister {
    type Error: std::error::Error + Send + Sync + 'static;

    fn put(&mut self, seqnum: SeqNum, frame: &[u8]) -> Result<(), Self::Error>;

    fn get_range(
        &mut self,
        from: SeqNum,
        to: SeqNum,
    ) -> Result<Vec<PersistedRecord>, Self::Error>;

    fn put_cursor(&mut self, direction: Direction, next_seq: SeqNum) -> Result<(), Self::Error>;

    fn get_cursor(&mut self, direction: Direction) -> Result<SeqNum, Self::Error>;

    fn reset(&mut self) -> Result<(), Self::Error>;
}

/// A `Persister` that discards everything. Useful for tests and for
/// sessions that never need resend support beyond the in-memory
/// high-water mark, since nothing durable survives to replay.
#[derive(Debug, Default)]
pub struct NullPersister {
    next_send: SeqNum,
    next_recv: SeqNum,
}

impl NullPersister {
    pub fn new() -> NullPersister {
        NullPersister {
            next_send: 1,
            next_recv: 1,
        }
    }
}

impl Persister for NullPersister {
    type Error = Infallible;

    fn put(&mut self, _seqnum: SeqNum, _frame: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn get_range(&mut self, _from: SeqNum, _to: SeqNum) -> Result<Vec<PersistedRecord>, Self::Error> {
        Ok(Vec::new())
    }

    fn put_cursor(&mut self, direction: Direction, next_seq: SeqNum) -> Result<(), Self::Error> {
        match direction {
            Direction::Send => self.next_send = next_seq,
            Direction::Recv => self.next_recv = next_seq,
        }
        Ok(())
    }

    fn get_cursor(&mut self, direction: Direction) -> Result<SeqNum, Self::Error> {
        Ok(match direction {
            Direction::Send => self.next_send,
            Direction::Recv => self.next_recv,
        })
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.next_send = 1;
        self.next_recv = 1;
        Ok(())
    }
}

/// In-memory `Persister`. Durable across reconnects within the same
/// process, but not across restarts -- a real deployment swaps this for a
/// file- or database-backed implementation behind the same trait.
#[derive(Debug, Default)]
pub struct InMemoryPersister {
    messages: BTreeMap<SeqNum, Vec<u8>>,
    next_send: SeqNum,
    next_recv: SeqNum,
}

impl InMemoryPersister {
    pub fn new() -> InMemoryPersister {
        InMemoryPersister {
            messages: BTreeMap::new(),
            next_send: 1,
            next_recv: 1,
        }
    }
}

impl Persister for InMemoryPersister {
    type Error = Infallible;

    fn put(&mut self, seqnum: SeqNum, frame: &[u8]) -> Result<(), Self::Error> {
        self.messages.insert(seqnum, frame.to_vec());
        Ok(())
    }

    fn get_range(&mut self, from: SeqNum, to: SeqNum) -> Result<Vec<PersistedRecord>, Self::Error> {
        let range: RangeInclusive<SeqNum> = from..=to;
        Ok(self
            .messages
            .range(range)
            .map(|(&seqnum, frame)| PersistedRecord {
                seqnum,
                frame: frame.clone(),
            })
            .collect())
    }

    fn put_cursor(&mut self, direction: Direction, next_seq: SeqNum) -> Result<(), Self::Error> {
        match direction {
            Direction::Send => self.next_send = next_seq,
            Direction::Recv => self.next_recv = next_seq,
        }
        Ok(())
    }

    fn get_cursor(&mut self, direction: Direction) -> Result<SeqNum, Self::Error> {
        Ok(match direction {
            Direction::Send => self.next_send,
            Direction::Recv => self.next_recv,
        })
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.messages.clear();
        self.next_send = 1;
        self.next_recv = 1;
        Ok(())
    }
}
