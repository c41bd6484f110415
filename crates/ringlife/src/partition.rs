//! Row partition planning.
//!
//! The grid is split into contiguous row ranges, one per worker. With
//! `base = ny / W` and `remainder = ny % W`, the first `remainder` workers
//! take `base + 1` rows and the rest take `base`, so row counts never differ
//! by more than one.
//!
//! ```text
//!  row 0  +-----------------+
//!         |    worker 0     |  base + 1
//!         +-----------------+
//!         |    worker 1     |  base + 1
//!         +-----------------+
//!         |    worker 2     |  base
//!  ny - 1 +-----------------+
//! ```
//!
//! Workers form a ring: the neighbor above worker 0 is worker `W - 1`.

use ringlife_core::{Result, RingLifeError, WorkerId};

/// A worker's contiguous global row range `[start, start + count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    /// First owned global row.
    pub start: usize,
    /// Number of owned rows.
    pub count: usize,
}

impl RowRange {
    /// One past the last owned row.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    /// Compute the range of `worker` without materializing the full plan.
    pub fn for_worker(ny: usize, workers: usize, worker: WorkerId) -> Result<Self> {
        check_plan(ny, workers)?;
        let rank = worker.index();
        if rank >= workers {
            return Err(RingLifeError::InvalidConfig(format!(
                "worker {} outside world of {} workers",
                rank, workers
            )));
        }

        let base = ny / workers;
        let remainder = ny % workers;
        let count = if rank < remainder { base + 1 } else { base };
        let start = rank * base + rank.min(remainder);
        Ok(Self { start, count })
    }
}

fn check_plan(ny: usize, workers: usize) -> Result<()> {
    if ny == 0 {
        return Err(RingLifeError::InvalidConfig(
            "grid height must be positive".to_string(),
        ));
    }
    if workers == 0 {
        return Err(RingLifeError::InvalidConfig(
            "worker count must be positive".to_string(),
        ));
    }
    if workers > ny {
        return Err(RingLifeError::TooManyWorkers { workers, rows: ny });
    }
    Ok(())
}

/// Plan the row ranges of all workers, in rank order.
pub fn plan_rows(ny: usize, workers: usize) -> Result<Vec<RowRange>> {
    check_plan(ny, workers)?;

    let base = ny / workers;
    let remainder = ny % workers;
    let mut start = 0;
    let ranges = (0..workers)
        .map(|rank| {
            let count = if rank < remainder { base + 1 } else { base };
            let range = RowRange { start, count };
            start += count;
            range
        })
        .collect();
    Ok(ranges)
}

/// The two ring neighbors of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingNeighbors {
    /// Owner of the row before this worker's first row.
    pub above: WorkerId,
    /// Owner of the row after this worker's last row.
    pub below: WorkerId,
}

impl RingNeighbors {
    /// Neighbors of `worker` in a ring of `workers`.
    pub fn of(worker: WorkerId, workers: usize) -> Self {
        let rank = worker.index();
        Self {
            above: WorkerId((rank + workers - 1) % workers),
            below: WorkerId((rank + 1) % workers),
        }
    }

    /// Whether both neighbors are the worker itself.
    pub fn is_self_loop(&self, worker: WorkerId) -> bool {
        self.above == worker && self.below == worker
    }
}
