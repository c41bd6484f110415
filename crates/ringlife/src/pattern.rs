//! Initial patterns.
//!
//! A pattern is resolved once at startup into a [`PatternGenerator`], a pure
//! function of global `(row, col)`. Any worker can evaluate any cell and gets
//! the same answer, so the initial grid does not depend on the decomposition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ringlife_core::{Result, RingLifeError};

use crate::rng::CellRng;

/// Probability that a cell starts alive in the random pattern.
pub const RANDOM_DENSITY: f64 = 0.1;

/// Gosper glider gun, 36x9.
const GLIDER_GUN: &[&str] = &[
    "........................#...........",
    "......................#.#...........",
    "............##......##............##",
    "...........#...#....##............##",
    "##........#.....#...##..............",
    "##........#...#.##....#.#...........",
    "..........#.....#.......#...........",
    "...........#...#....................",
    "............##......................",
];

const GLIDER: &[&str] = &[".#.", "..#", "###"];

const R_PENTOMINO: &[&str] = &[".##", "##.", ".#."];

/// Pattern names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Single glider.
    Glider,
    /// Gosper glider gun.
    #[serde(alias = "glider-gun")]
    GliderGun,
    /// R-pentomino methuselah.
    #[serde(alias = "r-pentomino")]
    RPentomino,
    /// Seeded random soup.
    Random,
}

impl PatternKind {
    /// All pattern kinds.
    pub const ALL: [PatternKind; 4] = [
        PatternKind::Glider,
        PatternKind::GliderGun,
        PatternKind::RPentomino,
        PatternKind::Random,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Glider => "glider",
            PatternKind::GliderGun => "glider_gun",
            PatternKind::RPentomino => "r_pentomino",
            PatternKind::Random => "random",
        }
    }

    /// Stable numeric code used in snapshot headers.
    pub fn code(self) -> u32 {
        match self {
            PatternKind::Glider => 1,
            PatternKind::GliderGun => 2,
            PatternKind::RPentomino => 3,
            PatternKind::Random => 4,
        }
    }

    /// Inverse of [`PatternKind::code`].
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Bind a seed, producing the resolved pattern.
    pub fn with_seed(self, seed: u64) -> Pattern {
        match self {
            PatternKind::Glider => Pattern::Glider,
            PatternKind::GliderGun => Pattern::GliderGun,
            PatternKind::RPentomino => Pattern::RPentomino,
            PatternKind::Random => Pattern::Random(seed),
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PatternKind {
    type Err = RingLifeError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| RingLifeError::UnknownPattern(s.to_string()))
    }
}

/// A pattern with all of its parameters bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Single glider.
    Glider,
    /// Gosper glider gun.
    GliderGun,
    /// R-pentomino.
    RPentomino,
    /// Random soup for a seed.
    Random(u64),
}

impl Pattern {
    /// Pattern kind without parameters.
    pub fn kind(self) -> PatternKind {
        match self {
            Pattern::Glider => PatternKind::Glider,
            Pattern::GliderGun => PatternKind::GliderGun,
            Pattern::RPentomino => PatternKind::RPentomino,
            Pattern::Random(_) => PatternKind::Random,
        }
    }

    /// Resolve into a generator for an `nx` x `ny` grid.
    pub fn generator(self, nx: usize, ny: usize) -> Result<PatternGenerator> {
        PatternGenerator::new(self, nx, ny)
    }
}

/// A fixed stamp placed at an anchor, wrapping around the torus.
#[derive(Debug, Clone, Copy)]
struct Stamp {
    rows: &'static [&'static str],
    anchor_row: usize,
    anchor_col: usize,
}

impl Stamp {
    fn height(&self) -> usize {
        self.rows.len()
    }

    fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }
}

#[derive(Debug, Clone, Copy)]
enum CellSource {
    Stamp(Stamp),
    Random(CellRng),
}

/// Last stamp index landing on `offset` when the stamp is written in order.
///
/// A stamp longer than the grid wraps onto itself; later writes win.
#[inline]
fn last_index(offset: usize, period: usize, len: usize) -> Option<usize> {
    if offset >= len {
        None
    } else {
        Some(offset + (len - 1 - offset) / period * period)
    }
}

/// Pure position-addressable initial state.
#[derive(Debug, Clone, Copy)]
pub struct PatternGenerator {
    pattern: Pattern,
    nx: usize,
    ny: usize,
    source: CellSource,
}

impl PatternGenerator {
    /// Resolve `pattern` for an `nx` x `ny` grid.
    pub fn new(pattern: Pattern, nx: usize, ny: usize) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(RingLifeError::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                nx, ny
            )));
        }

        let stamp = |rows, min_offset: usize, divisor: usize| Stamp {
            rows,
            anchor_row: min_offset.max(ny / divisor) % ny,
            anchor_col: min_offset.max(nx / divisor) % nx,
        };

        let source = match pattern {
            Pattern::GliderGun => CellSource::Stamp(stamp(GLIDER_GUN, 20, 4)),
            Pattern::Glider => CellSource::Stamp(stamp(GLIDER, 10, 2)),
            Pattern::RPentomino => CellSource::Stamp(stamp(R_PENTOMINO, 10, 2)),
            Pattern::Random(seed) => CellSource::Random(CellRng::new(seed)),
        };

        Ok(Self {
            pattern,
            nx,
            ny,
            source,
        })
    }

    /// The pattern this generator was resolved from.
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Grid width.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Grid height.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Anchor `(row, col)` of the stamp, if this is a stamped pattern.
    pub fn anchor(&self) -> Option<(usize, usize)> {
        match self.source {
            CellSource::Stamp(s) => Some((s.anchor_row, s.anchor_col)),
            CellSource::Random(_) => None,
        }
    }

    /// State of the cell at global `(row, col)`; coordinates wrap.
    pub fn cell(&self, row: usize, col: usize) -> u8 {
        let row = row % self.ny;
        let col = col % self.nx;

        match &self.source {
            CellSource::Stamp(stamp) => {
                let dr = (row + self.ny - stamp.anchor_row) % self.ny;
                let dc = (col + self.nx - stamp.anchor_col) % self.nx;
                let (Some(i), Some(j)) = (
                    last_index(dr, self.ny, stamp.height()),
                    last_index(dc, self.nx, stamp.width()),
                ) else {
                    return 0;
                };
                u8::from(stamp.rows[i].as_bytes()[j] == b'#')
            }
            CellSource::Random(rng) => {
                u8::from(rng.uniform(row as u64, col as u64) < RANDOM_DENSITY)
            }
        }
    }

    /// Fill `out` (length `nx`) with global row `row`.
    pub fn fill_row(&self, row: usize, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.nx);
        for (col, cell) in out.iter_mut().enumerate() {
            *cell = self.cell(row, col);
        }
    }

    /// Generate rows `[start, start + count)` as one row-major buffer.
    pub fn rows(&self, start: usize, count: usize) -> Vec<u8> {
        let mut cells = vec![0u8; count * self.nx];
        for (offset, row) in cells.chunks_exact_mut(self.nx).enumerate() {
            self.fill_row(start + offset, row);
        }
        cells
    }
}
