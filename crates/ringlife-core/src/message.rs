//! Message envelopes exchanged between workers.

use std::fmt;

/// Identity of a worker (its rank in `0..world_size`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// Rank as an index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for WorkerId {
    fn from(rank: usize) -> Self {
        WorkerId(rank)
    }
}

/// Message tag. Receives match on `(source, tag, sequence)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Sender's bottom boundary row, travelling to the neighbor below.
    /// Lands in the receiver's top ghost row.
    HaloDown,
    /// Sender's top boundary row, travelling to the neighbor above.
    /// Lands in the receiver's bottom ghost row.
    HaloUp,
    /// Rows scattered from the coordinator at init.
    Scatter,
    /// Interior rows gathered to the coordinator.
    Gather,
    /// Partial value for a reduction.
    Reduce,
    /// Value broadcast from the coordinator.
    Broadcast,
}

/// Routing header of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Message tag.
    pub tag: Tag,
    /// Sending worker.
    pub source: WorkerId,
    /// Receiving worker.
    pub destination: WorkerId,
    /// Generation number for halo traffic, collective sequence otherwise.
    pub sequence: u64,
    /// Payload length in bytes.
    pub payload_len: usize,
}

impl MessageHeader {
    /// Create a new header.
    pub fn new(
        tag: Tag,
        source: WorkerId,
        destination: WorkerId,
        sequence: u64,
        payload_len: usize,
    ) -> Self {
        Self {
            tag,
            source,
            destination,
            sequence,
            payload_len,
        }
    }

    /// Matching key used by pending receives.
    #[inline]
    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            source: self.source,
            tag: self.tag,
            sequence: self.sequence,
        }
    }
}

/// Key a receive is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    /// Expected sender.
    pub source: WorkerId,
    /// Expected tag.
    pub tag: Tag,
    /// Expected sequence.
    pub sequence: u64,
}

/// A header plus an owned payload.
#[derive(Debug, Clone)]
pub struct MessageEnvelope {
    /// Message header.
    pub header: MessageHeader,
    /// Serialized payload.
    pub payload: Vec<u8>,
}

impl MessageEnvelope {
    /// Wrap a payload, filling in its length.
    pub fn new(
        tag: Tag,
        source: WorkerId,
        destination: WorkerId,
        sequence: u64,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            header: MessageHeader::new(tag, source, destination, sequence, payload.len()),
            payload,
        }
    }

    /// Whether the declared length agrees with the carried payload.
    pub fn is_consistent(&self) -> bool {
        self.header.payload_len == self.payload.len()
    }
}
