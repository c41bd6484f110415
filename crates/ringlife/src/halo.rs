//! Halo exchange between ring neighbors.
//!
//! Each generation, a worker sends its top interior row to the neighbor above
//! and its bottom interior row to the neighbor below, and receives the
//! matching rows into its ghost rows:
//!
//! ```text
//!   worker r-1   bottom row ──HaloDown──▶ top ghost      worker r
//!   worker r     top row    ──HaloUp────▶ bottom ghost   worker r-1
//! ```
//!
//! All four operations are posted before any of them is waited on, so the
//! exchange cannot deadlock for any ring size. With two workers both
//! neighbors are the same peer; the tags keep the two rows apart. A single
//! worker is its own neighbor and copies its boundary rows locally.

use tracing::trace;

use ringlife_core::transport::{RecvRequest, SendRequest};
use ringlife_core::{Phase, Result, RingLifeError, Tag, Transport, WorkerId};

use crate::local::LocalGrid;
use crate::partition::RingNeighbors;

/// Halo exchange for one worker.
#[derive(Debug, Clone, Copy)]
pub struct HaloExchange {
    worker: WorkerId,
    neighbors: RingNeighbors,
}

impl HaloExchange {
    /// Exchange for `worker` in a ring of `workers`.
    pub fn new(worker: WorkerId, workers: usize) -> Self {
        Self {
            worker,
            neighbors: RingNeighbors::of(worker, workers),
        }
    }

    /// Ring neighbors.
    pub fn neighbors(&self) -> RingNeighbors {
        self.neighbors
    }

    /// Post the exchange for `generation` without blocking.
    ///
    /// Receives are posted before sends. The returned handle must be
    /// completed before the grid is stepped.
    pub fn post<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        grid: &LocalGrid,
        generation: u64,
    ) -> Result<PendingExchange> {
        if self.neighbors.is_self_loop(self.worker) {
            return Ok(PendingExchange::Local);
        }

        let RingNeighbors { above, below } = self.neighbors;
        let from_above = transport.post_recv(above, Tag::HaloDown, generation);
        let from_below = transport.post_recv(below, Tag::HaloUp, generation);

        let to_below = transport
            .post_send(below, Tag::HaloDown, generation, grid.bottom_boundary().to_vec())
            .map_err(|e| e.with_context(self.worker, Phase::Exchange))?;
        let to_above = transport
            .post_send(above, Tag::HaloUp, generation, grid.top_boundary().to_vec())
            .map_err(|e| e.with_context(self.worker, Phase::Exchange))?;

        trace!(
            worker = %self.worker,
            generation,
            above = %above,
            below = %below,
            "halo exchange posted"
        );

        Ok(PendingExchange::Remote {
            worker: self.worker,
            sends: vec![to_below, to_above],
            recvs: vec![from_above, from_below],
        })
    }

    /// Post and complete the exchange in one call.
    pub async fn exchange<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        grid: &mut LocalGrid,
        generation: u64,
    ) -> Result<()> {
        self.post(transport, grid, generation)?
            .complete(transport, grid)
            .await
    }
}

/// A posted halo exchange.
#[derive(Debug)]
#[must_use = "a posted exchange must be completed before stepping"]
pub enum PendingExchange {
    /// Single worker: ghosts are the worker's own boundary rows.
    Local,
    /// Two receives and two sends in flight.
    Remote {
        /// Worker that posted the exchange.
        worker: WorkerId,
        /// Bottom row to the neighbor below, top row to the neighbor above.
        sends: Vec<SendRequest>,
        /// Row from above, row from below.
        recvs: Vec<RecvRequest>,
    },
}

impl PendingExchange {
    /// Wait for every posted operation and install the ghost rows.
    pub async fn complete<T: Transport + ?Sized>(
        self,
        transport: &mut T,
        grid: &mut LocalGrid,
    ) -> Result<()> {
        match self {
            PendingExchange::Local => {
                let top = grid.bottom_boundary().to_vec();
                let bottom = grid.top_boundary().to_vec();
                grid.set_ghosts(&top, &bottom)
            }
            PendingExchange::Remote {
                worker,
                sends,
                recvs,
            } => {
                let received = transport
                    .wait_all(sends, recvs)
                    .await
                    .map_err(|e| e.with_context(worker, Phase::Exchange))?;

                let [top, bottom]: [Vec<u8>; 2] = received.try_into().map_err(|r: Vec<_>| {
                    RingLifeError::communication(
                        worker,
                        Phase::Exchange,
                        format!("expected 2 halo rows, got {}", r.len()),
                    )
                })?;
                grid.set_ghosts(&top, &bottom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::plan_rows;
    use ringlife_core::W2WBuilder;

    fn striped(worker: usize, nx: usize, rows: usize) -> Vec<u8> {
        // Row i of worker w is filled with the value w * 10 + i
        (0..rows)
            .flat_map(|i| std::iter::repeat((worker * 10 + i) as u8).take(nx))
            .collect()
    }

    #[tokio::test]
    async fn test_single_worker_wraps_locally() {
        let broker = W2WBuilder::new().world_size(1).build();
        let mut endpoint = broker.register(WorkerId(0));
        let range = plan_rows(3, 1).unwrap()[0];
        let mut grid = LocalGrid::from_interior(WorkerId(0), 4, range, &striped(0, 4, 3)).unwrap();

        let halo = HaloExchange::new(WorkerId(0), 1);
        halo.exchange(&mut endpoint, &mut grid, 0).await.unwrap();

        assert!(grid.ghosts_fresh());
        assert_eq!(grid.row(0), &[2; 4]);
        assert_eq!(grid.row(4), &[0; 4]);
        assert_eq!(broker.stats().messages_delivered, 0);
    }

    #[tokio::test]
    async fn test_ring_exchange() {
        for workers in [2usize, 3, 4] {
            let nx = 5;
            let rows_each = 3;
            let broker = W2WBuilder::new().world_size(workers).build();
            let ranges = plan_rows(workers * rows_each, workers).unwrap();

            let endpoints: Vec<_> = (0..workers).map(|r| broker.register(WorkerId(r))).collect();

            let mut handles = Vec::new();
            for ((rank, range), mut endpoint) in ranges.into_iter().enumerate().zip(endpoints) {
                handles.push(tokio::spawn(async move {
                    let mut grid = LocalGrid::from_interior(
                        WorkerId(rank),
                        nx,
                        range,
                        &striped(rank, nx, rows_each),
                    )
                    .unwrap();
                    HaloExchange::new(WorkerId(rank), workers)
                        .exchange(&mut endpoint, &mut grid, 7)
                        .await
                        .unwrap();
                    (grid.row(0).to_vec(), grid.row(rows_each + 1).to_vec())
                }));
            }

            for (rank, handle) in handles.into_iter().enumerate() {
                let (top, bottom) = handle.await.unwrap();
                let above = (rank + workers - 1) % workers;
                let below = (rank + 1) % workers;
                assert_eq!(top, vec![(above * 10 + rows_each - 1) as u8; nx]);
                assert_eq!(bottom, vec![(below * 10) as u8; nx]);
            }
        }
    }

    #[tokio::test]
    async fn test_missing_neighbor_is_exchange_error() {
        let broker = W2WBuilder::new().world_size(2).build();
        let mut endpoint = broker.register(WorkerId(0));
        let range = plan_rows(4, 2).unwrap()[0];
        let mut grid = LocalGrid::new(WorkerId(0), 4, range);

        let err = HaloExchange::new(WorkerId(0), 2)
            .exchange(&mut endpoint, &mut grid, 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RingLifeError::Communication {
                phase: Phase::Exchange,
                ..
            }
        ));
        assert!(!grid.ghosts_fresh());
    }
}
