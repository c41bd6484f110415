//! Two-phase point-to-point transport.
//!
//! Operations are posted first and completed later with a single combined
//! wait, mirroring non-blocking send/receive plus wait-all. Posting every
//! receive and send before blocking keeps ring exchanges deadlock-free for any
//! world size, including a worker that is its own neighbor.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{MatchKey, Tag, WorkerId};
use crate::w2w::DeliveryStatus;

/// A posted send awaiting completion.
#[derive(Debug, Clone, Copy)]
#[must_use = "posted sends must be completed with wait_all"]
pub struct SendRequest {
    /// Destination worker.
    pub destination: WorkerId,
    /// Message tag.
    pub tag: Tag,
    /// Message sequence.
    pub sequence: u64,
    /// Delivery status observed when the send was posted.
    pub status: DeliveryStatus,
}

/// A posted receive awaiting completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "posted receives must be completed with wait_all"]
pub struct RecvRequest {
    /// What the receive matches on.
    pub key: MatchKey,
}

/// Point-to-point transport between the workers of one run.
#[async_trait]
pub trait Transport: Send {
    /// This worker's rank.
    fn rank(&self) -> WorkerId;

    /// Number of workers in the run.
    fn world_size(&self) -> usize;

    /// Post a send. Returns immediately; failures surface on [`Transport::wait_all`]
    /// unless the destination is invalid.
    fn post_send(
        &mut self,
        destination: WorkerId,
        tag: Tag,
        sequence: u64,
        payload: Vec<u8>,
    ) -> Result<SendRequest>;

    /// Post a receive for the message matching `(source, tag, sequence)`.
    fn post_recv(&mut self, source: WorkerId, tag: Tag, sequence: u64) -> RecvRequest {
        RecvRequest {
            key: MatchKey {
                source,
                tag,
                sequence,
            },
        }
    }

    /// Block until all posted sends and receives complete.
    ///
    /// Received payloads are returned in the order of `recvs`.
    async fn wait_all(
        &mut self,
        sends: Vec<SendRequest>,
        recvs: Vec<RecvRequest>,
    ) -> Result<Vec<Vec<u8>>>;
}
