//! Grid distribution: initial local buffers and reassembly of the global grid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ringlife_core::collective::{gather, scatter};
use ringlife_core::{Phase, Result, RingLifeError, Role, Transport};

use crate::local::LocalGrid;
use crate::partition::{plan_rows, RowRange};
use crate::pattern::PatternGenerator;

/// How workers obtain their initial rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMode {
    /// Each worker evaluates the pattern for its own rows.
    #[default]
    Local,
    /// The coordinator generates the whole grid and scatters the rows.
    Scatter,
}

impl fmt::Display for InitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitMode::Local => f.write_str("local"),
            InitMode::Scatter => f.write_str("scatter"),
        }
    }
}

impl FromStr for InitMode {
    type Err = RingLifeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(InitMode::Local),
            "scatter" => Ok(InitMode::Scatter),
            other => Err(RingLifeError::InvalidConfig(format!(
                "unknown init mode '{}' (expected local or scatter)",
                other
            ))),
        }
    }
}

/// The full grid, materialized on the coordinator only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalGrid {
    /// Width.
    pub nx: usize,
    /// Height.
    pub ny: usize,
    /// Row-major cells, `ny * nx`.
    pub cells: Vec<u8>,
}

impl GlobalGrid {
    /// Wrap row-major cells.
    pub fn new(nx: usize, ny: usize, cells: Vec<u8>) -> Result<Self> {
        let expected = nx.checked_mul(ny).ok_or_else(|| {
            RingLifeError::InvalidConfig(format!("grid of {}x{} is too large", nx, ny))
        })?;
        if cells.len() != expected {
            return Err(RingLifeError::InvalidConfig(format!(
                "grid of {}x{} needs {} cells, got {}",
                nx,
                ny,
                expected,
                cells.len()
            )));
        }
        Ok(Self { nx, ny, cells })
    }

    /// Generate the whole grid from a pattern.
    pub fn generate(generator: &PatternGenerator) -> Self {
        Self {
            nx: generator.nx(),
            ny: generator.ny(),
            cells: generator.rows(0, generator.ny()),
        }
    }

    /// Row `r`.
    pub fn row(&self, r: usize) -> &[u8] {
        &self.cells[r * self.nx..(r + 1) * self.nx]
    }

    /// Cell at `(r, c)`; coordinates wrap.
    pub fn get(&self, r: usize, c: usize) -> u8 {
        self.cells[(r % self.ny) * self.nx + c % self.nx]
    }

    /// Number of alive cells.
    pub fn alive_cells(&self) -> u64 {
        self.cells.iter().map(|&c| c as u64).sum()
    }

    /// Rows of one partition as a buffer.
    pub fn rows_of(&self, range: RowRange) -> &[u8] {
        &self.cells[range.start * self.nx..range.end() * self.nx]
    }
}

/// Build a worker's initial partition.
///
/// With [`InitMode::Scatter`] this is a collective: every worker must call it
/// with the same `sequence`.
pub async fn initialize<T: Transport + ?Sized>(
    transport: &mut T,
    role: Role,
    sequence: u64,
    generator: &PatternGenerator,
    mode: InitMode,
) -> Result<LocalGrid> {
    let me = transport.rank();
    let workers = transport.world_size();
    let range = RowRange::for_worker(generator.ny(), workers, me)?;

    match mode {
        InitMode::Local => Ok(LocalGrid::generate(me, range, generator)),
        InitMode::Scatter => {
            let parts = if role.is_coordinator() {
                let grid = GlobalGrid::generate(generator);
                let parts = plan_rows(grid.ny, workers)?
                    .into_iter()
                    .map(|r| grid.rows_of(r).to_vec())
                    .collect();
                debug!(worker = %me, alive = grid.alive_cells(), "scattering initial grid");
                Some(parts)
            } else {
                None
            };

            let interior = scatter(transport, role, sequence, parts)
                .await
                .map_err(|e| e.with_context(me, Phase::Init))?;
            LocalGrid::from_interior(me, generator.nx(), range, &interior)
        }
    }
}

/// Collect every partition's interior rows, in global row order, on the
/// coordinator. Participants get `None`.
pub async fn gather_grid<T: Transport + ?Sized>(
    transport: &mut T,
    role: Role,
    sequence: u64,
    grid: &LocalGrid,
    ny: usize,
) -> Result<Option<GlobalGrid>> {
    let me = transport.rank();
    let parts = gather(transport, role, sequence, grid.interior().to_vec())
        .await
        .map_err(|e| e.with_context(me, Phase::Gather))?;

    let Some(parts) = parts else {
        return Ok(None);
    };

    let cells = parts.concat();
    if cells.len() != grid.nx() * ny {
        return Err(RingLifeError::communication(
            me,
            Phase::Gather,
            format!(
                "gathered {} cells, expected {}x{}",
                cells.len(),
                grid.nx(),
                ny
            ),
        ));
    }
    Ok(Some(GlobalGrid {
        nx: grid.nx(),
        ny,
        cells,
    }))
}
