//! A worker's partition buffer.
//!
//! Layout: row-major, `(row_count + 2) * nx` cells, with one ghost row above
//! and below the interior.
//!
//! ```text
//! +---------------------------+
//! | ghost (neighbor above)    |  local row 0
//! +---------------------------+
//! | interior row 1            |  global row `start`
//! | ...                       |
//! | interior row `row_count`  |  global row `end - 1`
//! +---------------------------+
//! | ghost (neighbor below)    |  local row `row_count + 1`
//! +---------------------------+
//! ```
//!
//! The buffer is double-buffered: the kernel writes the next generation into
//! a second buffer, then the two are swapped.

use ringlife_core::{Phase, Result, RingLifeError, WorkerId};

use crate::kernel;
use crate::partition::RowRange;
use crate::pattern::PatternGenerator;

/// Double-buffered local partition with ghost rows.
#[derive(Debug, Clone)]
pub struct LocalGrid {
    worker: WorkerId,
    nx: usize,
    range: RowRange,
    current: Vec<u8>,
    next: Vec<u8>,
    /// Both ghost rows hold the neighbors' rows for the current generation.
    ghosts_fresh: bool,
}

impl LocalGrid {
    /// Create an all-dead partition.
    pub fn new(worker: WorkerId, nx: usize, range: RowRange) -> Self {
        let len = (range.count + 2) * nx;
        Self {
            worker,
            nx,
            range,
            current: vec![0; len],
            next: vec![0; len],
            ghosts_fresh: false,
        }
    }

    /// Create a partition from its interior rows (`count * nx` cells).
    pub fn from_interior(
        worker: WorkerId,
        nx: usize,
        range: RowRange,
        interior: &[u8],
    ) -> Result<Self> {
        if interior.len() != range.count * nx {
            return Err(RingLifeError::WorkerFailed {
                worker,
                phase: Phase::Init,
                message: format!(
                    "interior has {} cells, expected {} rows of {}",
                    interior.len(),
                    range.count,
                    nx
                ),
            });
        }
        let mut grid = Self::new(worker, nx, range);
        grid.current[nx..(range.count + 1) * nx].copy_from_slice(interior);
        Ok(grid)
    }

    /// Generate the partition's rows directly from a pattern.
    pub fn generate(worker: WorkerId, range: RowRange, generator: &PatternGenerator) -> Self {
        let nx = generator.nx();
        let mut grid = Self::new(worker, nx, range);
        for (offset, row) in grid.current[nx..(range.count + 1) * nx]
            .chunks_exact_mut(nx)
            .enumerate()
        {
            generator.fill_row(range.start + offset, row);
        }
        grid
    }

    /// Owning worker.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Grid width.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Global row range owned.
    pub fn range(&self) -> RowRange {
        self.range
    }

    /// Number of interior rows.
    pub fn row_count(&self) -> usize {
        self.range.count
    }

    /// Local row `i` in `0..row_count + 2`.
    pub fn row(&self, i: usize) -> &[u8] {
        &self.current[i * self.nx..(i + 1) * self.nx]
    }

    /// First interior row, sent to the neighbor above.
    pub fn top_boundary(&self) -> &[u8] {
        self.row(1)
    }

    /// Last interior row, sent to the neighbor below.
    pub fn bottom_boundary(&self) -> &[u8] {
        self.row(self.range.count)
    }

    /// Interior rows as one buffer.
    pub fn interior(&self) -> &[u8] {
        &self.current[self.nx..(self.range.count + 1) * self.nx]
    }

    /// Whether ghost rows are current for this generation.
    pub fn ghosts_fresh(&self) -> bool {
        self.ghosts_fresh
    }

    /// Install both ghost rows for the current generation.
    pub fn set_ghosts(&mut self, top: &[u8], bottom: &[u8]) -> Result<()> {
        for (which, row) in [("top", top), ("bottom", bottom)] {
            if row.len() != self.nx {
                return Err(RingLifeError::communication(
                    self.worker,
                    Phase::Exchange,
                    format!("{} ghost row has {} cells, expected {}", which, row.len(), self.nx),
                ));
            }
        }

        let nx = self.nx;
        let bottom_start = (self.range.count + 1) * nx;
        self.current[..nx].copy_from_slice(top);
        self.current[bottom_start..bottom_start + nx].copy_from_slice(bottom);
        self.ghosts_fresh = true;
        Ok(())
    }

    /// Advance one generation and swap buffers.
    ///
    /// Fails if the ghost rows were not refreshed since the last step.
    pub fn step(&mut self) -> Result<()> {
        if !self.ghosts_fresh {
            return Err(RingLifeError::WorkerFailed {
                worker: self.worker,
                phase: Phase::Kernel,
                message: "step attempted with stale ghost rows".to_string(),
            });
        }

        kernel::step(&self.current, &mut self.next, self.nx, self.range.count);
        std::mem::swap(&mut self.current, &mut self.next);
        self.ghosts_fresh = false;
        Ok(())
    }

    /// Count alive interior cells.
    pub fn alive_count(&self) -> u64 {
        self.interior().iter().map(|&c| c as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;

    fn range(start: usize, count: usize) -> RowRange {
        RowRange { start, count }
    }

    #[test]
    fn test_boundaries_and_interior() {
        let interior: Vec<u8> = vec![1, 0, 0, 0, 1, 0, 0, 0, 1];
        let grid = LocalGrid::from_interior(WorkerId(0), 3, range(4, 3), &interior).unwrap();
        assert_eq!(grid.top_boundary(), &[1, 0, 0]);
        assert_eq!(grid.bottom_boundary(), &[0, 0, 1]);
        assert_eq!(grid.interior(), interior.as_slice());
        assert_eq!(grid.alive_count(), 3);
    }

    #[test]
    fn test_from_interior_length_checked() {
        assert!(LocalGrid::from_interior(WorkerId(1), 4, range(0, 2), &[0; 7]).is_err());
    }

    #[test]
    fn test_generate_uses_global_rows() {
        let gen = Pattern::Glider.generator(16, 16).unwrap();
        // Glider anchored at row 10 occupies rows 10..13; rows 8..12 hold two cells
        let grid = LocalGrid::generate(WorkerId(1), range(8, 4), &gen);
        assert_eq!(grid.alive_count(), 2);
        assert_eq!(grid.row(3), &gen.rows(10, 1)[..]);
    }

    #[test]
    fn test_step_requires_fresh_ghosts() {
        let mut grid = LocalGrid::new(WorkerId(2), 4, range(0, 2));
        let err = grid.step().unwrap_err();
        assert!(matches!(
            err,
            RingLifeError::WorkerFailed {
                phase: Phase::Kernel,
                ..
            }
        ));

        grid.set_ghosts(&[0; 4], &[0; 4]).unwrap();
        grid.step().unwrap();
        assert!(!grid.ghosts_fresh());
        assert!(grid.step().is_err());
    }

    #[test]
    fn test_ghost_length_checked() {
        let mut grid = LocalGrid::new(WorkerId(0), 4, range(0, 2));
        assert!(grid.set_ghosts(&[0; 3], &[0; 4]).is_err());
        assert!(!grid.ghosts_fresh());
    }

    #[test]
    fn test_ghost_rows_feed_edge_cells() {
        // Two live cells in the ghost row above give the first interior row
        // a birth when combined with one interior neighbor.
        let mut grid =
            LocalGrid::from_interior(WorkerId(0), 5, range(0, 2), &[0, 0, 0, 0, 0, 0, 0, 1, 0, 0])
                .unwrap();
        grid.set_ghosts(&[0, 1, 0, 1, 0], &[0; 5]).unwrap();
        grid.step().unwrap();
        assert_eq!(grid.row(1), &[0, 0, 1, 0, 0]);
    }
}
