//! Collective operations built from point-to-point messages.
//!
//! Every worker of a run must call the same collectives in the same order with
//! the same sequence numbers. The coordinator is named through an explicit
//! [`Role`] rather than inferred from the rank.

use crate::error::{Phase, Result, RingLifeError};
use crate::message::{Tag, WorkerId};
use crate::transport::Transport;

/// Role of a worker in collectives and coordinator-only work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This worker gathers, scatters, reduces and writes outputs.
    Coordinator,
    /// This worker participates; `coordinator` names the root.
    Participant {
        /// Rank of the coordinating worker.
        coordinator: WorkerId,
    },
}

impl Role {
    /// Role of `rank` when `coordinator` is the root.
    pub fn for_rank(rank: WorkerId, coordinator: WorkerId) -> Self {
        if rank == coordinator {
            Role::Coordinator
        } else {
            Role::Participant { coordinator }
        }
    }

    /// Whether this worker is the coordinator.
    pub fn is_coordinator(self) -> bool {
        matches!(self, Role::Coordinator)
    }
}

fn decode_u64(worker: WorkerId, phase: Phase, bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        RingLifeError::communication(
            worker,
            phase,
            format!("expected 8-byte integer payload, got {} bytes", bytes.len()),
        )
    })?;
    Ok(u64::from_le_bytes(raw))
}

/// Collect one payload per worker at the coordinator, in rank order.
///
/// Returns `Some(parts)` on the coordinator and `None` elsewhere.
pub async fn gather<T: Transport + ?Sized>(
    transport: &mut T,
    role: Role,
    sequence: u64,
    payload: Vec<u8>,
) -> Result<Option<Vec<Vec<u8>>>> {
    let me = transport.rank();
    let world = transport.world_size();

    match role {
        Role::Coordinator => {
            let recvs = (0..world)
                .filter(|&r| r != me.index())
                .map(|r| transport.post_recv(WorkerId(r), Tag::Gather, sequence))
                .collect();
            let mut received = transport.wait_all(Vec::new(), recvs).await?.into_iter();

            let mut own = Some(payload);
            let mut parts = Vec::with_capacity(world);
            for r in 0..world {
                let part = if r == me.index() {
                    own.take()
                } else {
                    received.next()
                };
                parts.push(part.ok_or_else(|| {
                    RingLifeError::communication(me, Phase::Gather, "missing gathered part")
                })?);
            }
            Ok(Some(parts))
        }
        Role::Participant { coordinator } => {
            let send = transport.post_send(coordinator, Tag::Gather, sequence, payload)?;
            transport.wait_all(vec![send], Vec::new()).await?;
            Ok(None)
        }
    }
}

/// Hand each worker its part from the coordinator.
///
/// The coordinator passes one part per worker in rank order; participants
/// pass `None`. Every worker returns its own part.
pub async fn scatter<T: Transport + ?Sized>(
    transport: &mut T,
    role: Role,
    sequence: u64,
    parts: Option<Vec<Vec<u8>>>,
) -> Result<Vec<u8>> {
    let me = transport.rank();
    let world = transport.world_size();

    match role {
        Role::Coordinator => {
            let parts = parts.ok_or_else(|| {
                RingLifeError::communication(me, Phase::Init, "coordinator has nothing to scatter")
            })?;
            if parts.len() != world {
                return Err(RingLifeError::communication(
                    me,
                    Phase::Init,
                    format!("scatter needs {} parts, got {}", world, parts.len()),
                ));
            }

            let mut own = Vec::new();
            let mut sends = Vec::with_capacity(world.saturating_sub(1));
            for (r, part) in parts.into_iter().enumerate() {
                if r == me.index() {
                    own = part;
                } else {
                    sends.push(transport.post_send(WorkerId(r), Tag::Scatter, sequence, part)?);
                }
            }
            transport.wait_all(sends, Vec::new()).await?;
            Ok(own)
        }
        Role::Participant { coordinator } => {
            let recv = transport.post_recv(coordinator, Tag::Scatter, sequence);
            let mut received = transport.wait_all(Vec::new(), vec![recv]).await?;
            received.pop().ok_or_else(|| {
                RingLifeError::communication(me, Phase::Init, "missing scattered part")
            })
        }
    }
}

/// Broadcast a value from the coordinator to every worker.
pub async fn broadcast_u64<T: Transport + ?Sized>(
    transport: &mut T,
    role: Role,
    sequence: u64,
    value: u64,
) -> Result<u64> {
    let me = transport.rank();
    let world = transport.world_size();

    match role {
        Role::Coordinator => {
            let mut sends = Vec::with_capacity(world.saturating_sub(1));
            for r in (0..world).filter(|&r| r != me.index()) {
                sends.push(transport.post_send(
                    WorkerId(r),
                    Tag::Broadcast,
                    sequence,
                    value.to_le_bytes().to_vec(),
                )?);
            }
            transport.wait_all(sends, Vec::new()).await?;
            Ok(value)
        }
        Role::Participant { coordinator } => {
            let recv = transport.post_recv(coordinator, Tag::Broadcast, sequence);
            let received = transport.wait_all(Vec::new(), vec![recv]).await?;
            let bytes = received.first().map(Vec::as_slice).unwrap_or_default();
            decode_u64(me, Phase::Reduce, bytes)
        }
    }
}

/// Sum an integer across all workers; every worker receives the total.
///
/// Integer addition keeps the result independent of arrival order.
pub async fn all_reduce_sum<T: Transport + ?Sized>(
    transport: &mut T,
    role: Role,
    sequence: u64,
    local: u64,
) -> Result<u64> {
    let me = transport.rank();
    let world = transport.world_size();

    let total = match role {
        Role::Coordinator => {
            let recvs = (0..world)
                .filter(|&r| r != me.index())
                .map(|r| transport.post_recv(WorkerId(r), Tag::Reduce, sequence))
                .collect();
            let received = transport.wait_all(Vec::new(), recvs).await?;

            let mut total = local;
            for bytes in &received {
                total = total
                    .checked_add(decode_u64(me, Phase::Reduce, bytes)?)
                    .ok_or_else(|| {
                        RingLifeError::communication(me, Phase::Reduce, "reduction overflow")
                    })?;
            }
            total
        }
        Role::Participant { coordinator } => {
            let send = transport.post_send(
                coordinator,
                Tag::Reduce,
                sequence,
                local.to_le_bytes().to_vec(),
            )?;
            transport.wait_all(vec![send], Vec::new()).await?;
            0
        }
    };

    broadcast_u64(transport, role, sequence, total).await
}

/// Block until every worker reaches this point.
pub async fn barrier<T: Transport + ?Sized>(
    transport: &mut T,
    role: Role,
    sequence: u64,
) -> Result<()> {
    all_reduce_sum(transport, role, sequence, 0).await.map(|_| ())
}
