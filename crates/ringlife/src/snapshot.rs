//! Snapshot artifacts.
//!
//! The coordinator hands each reassembled grid to a [`SnapshotWriter`]. The
//! file format written by [`FileSnapshotWriter`] is a fixed 72-byte
//! little-endian header followed by `ny * nx` cell bytes, row-major:
//!
//! ```text
//! offset  size  field
//!      0     4  magic "RLSN"
//!      4     4  format version
//!      8     8  nx
//!     16     8  ny
//!     24     8  step
//!     32     4  pattern code
//!     36     4  flags (bit 0: final snapshot)
//!     40     8  seed
//!     48     8  checksum
//!     56     8  alive cells
//!     64     8  elapsed seconds (f64 bits)
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use ringlife_core::{Result, RingLifeError};

use crate::distributor::GlobalGrid;
use crate::pattern::PatternKind;

/// File magic, "RLSN".
pub const SNAPSHOT_MAGIC: u32 = u32::from_le_bytes(*b"RLSN");

/// Current format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot file extension.
pub const SNAPSHOT_EXTENSION: &str = "rls";

const FLAG_FINAL: u32 = 1;

/// On-disk header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SnapshotHeader {
    magic: u32,
    version: u32,
    nx: u64,
    ny: u64,
    step: u64,
    pattern_code: u32,
    flags: u32,
    seed: u64,
    checksum: u64,
    alive_cells: u64,
    elapsed_bits: u64,
}

/// Header size in bytes.
pub const HEADER_LEN: usize = std::mem::size_of::<SnapshotHeader>();

impl SnapshotHeader {
    fn encode(snapshot: &Snapshot) -> Self {
        let summary = snapshot.summary.unwrap_or_default();
        Self {
            magic: SNAPSHOT_MAGIC.to_le(),
            version: SNAPSHOT_VERSION.to_le(),
            nx: (snapshot.grid.nx as u64).to_le(),
            ny: (snapshot.grid.ny as u64).to_le(),
            step: snapshot.step.to_le(),
            pattern_code: snapshot.pattern.code().to_le(),
            flags: (if snapshot.summary.is_some() { FLAG_FINAL } else { 0 }).to_le(),
            seed: snapshot.seed.to_le(),
            checksum: summary.checksum.to_le(),
            alive_cells: summary.alive_cells.to_le(),
            elapsed_bits: summary.elapsed_seconds.to_bits().to_le(),
        }
    }
}

/// Statistics attached to the final snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FinalSummary {
    /// Global alive-cell checksum.
    pub checksum: u64,
    /// Alive cells in the gathered grid.
    pub alive_cells: u64,
    /// Timed exchange and kernel seconds.
    pub elapsed_seconds: f64,
}

/// A reassembled grid at one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Generation the grid is at.
    pub step: u64,
    /// Initial pattern of the run.
    pub pattern: PatternKind,
    /// Seed of the run.
    pub seed: u64,
    /// Present on the final snapshot only.
    pub summary: Option<FinalSummary>,
    /// The grid.
    pub grid: GlobalGrid,
}

impl Snapshot {
    /// Whether this is the final snapshot of a run.
    pub fn is_final(&self) -> bool {
        self.summary.is_some()
    }

    /// Encode header and cells.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = SnapshotHeader::encode(self);
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.grid.cells.len());
        bytes.extend_from_slice(bytemuck::bytes_of(&header));
        bytes.extend_from_slice(&self.grid.cells);
        bytes
    }

    /// Decode a snapshot written by [`Snapshot::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(RingLifeError::Snapshot(format!(
                "{} bytes is shorter than the {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }
        let header: SnapshotHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);

        if u32::from_le(header.magic) != SNAPSHOT_MAGIC {
            return Err(RingLifeError::Snapshot("bad magic".to_string()));
        }
        let version = u32::from_le(header.version);
        if version != SNAPSHOT_VERSION {
            return Err(RingLifeError::Snapshot(format!(
                "unsupported format version {}",
                version
            )));
        }

        let code = u32::from_le(header.pattern_code);
        let pattern = PatternKind::from_code(code)
            .ok_or_else(|| RingLifeError::Snapshot(format!("unknown pattern code {}", code)))?;

        let dim = |raw: u64| {
            usize::try_from(u64::from_le(raw))
                .map_err(|_| RingLifeError::Snapshot("grid dimension out of range".to_string()))
        };
        let nx = dim(header.nx)?;
        let ny = dim(header.ny)?;
        let cells = &bytes[HEADER_LEN..];
        let grid = GlobalGrid::new(nx, ny, cells.to_vec())
            .map_err(|e| RingLifeError::Snapshot(e.to_string()))?;

        let summary = (u32::from_le(header.flags) & FLAG_FINAL != 0).then(|| FinalSummary {
            checksum: u64::from_le(header.checksum),
            alive_cells: u64::from_le(header.alive_cells),
            elapsed_seconds: f64::from_bits(u64::from_le(header.elapsed_bits)),
        });

        Ok(Self {
            step: u64::from_le(header.step),
            pattern,
            seed: u64::from_le(header.seed),
            summary,
            grid,
        })
    }
}

/// Receives snapshots from the coordinator.
pub trait SnapshotWriter: Send {
    /// Persist one snapshot.
    fn write(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Path of the snapshot for `step` under `dir`.
pub fn snapshot_path(dir: &Path, step: u64) -> PathBuf {
    dir.join(format!("step_{:06}.{}", step, SNAPSHOT_EXTENSION))
}

/// Read a snapshot file.
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let bytes = fs::read(path.as_ref())?;
    Snapshot::from_bytes(&bytes)
}

/// Writes `step_NNNNNN.rls` files into a directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotWriter {
    dir: PathBuf,
    created: bool,
}

impl FileSnapshotWriter {
    /// Writer targeting `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            created: false,
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotWriter for FileSnapshotWriter {
    fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        if !self.created {
            fs::create_dir_all(&self.dir)?;
            self.created = true;
        }

        let path = snapshot_path(&self.dir, snapshot.step);
        fs::write(&path, snapshot.to_bytes())?;
        debug!(
            step = snapshot.step,
            path = %path.display(),
            alive = snapshot.grid.alive_cells(),
            "snapshot written"
        );
        Ok(())
    }
}

/// Keeps snapshots in memory; clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotWriter {
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
}

impl MemorySnapshotWriter {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().clone()
    }

    /// Steps written so far, in write order.
    pub fn steps(&self) -> Vec<u64> {
        self.snapshots.lock().iter().map(|s| s.step).collect()
    }
}

impl SnapshotWriter for MemorySnapshotWriter {
    fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.lock().push(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(summary: Option<FinalSummary>) -> Snapshot {
        Snapshot {
            step: 42,
            pattern: PatternKind::Random,
            seed: 9,
            summary,
            grid: GlobalGrid::new(4, 3, vec![1, 0, 0, 1, 0, 1, 1, 0, 0, 0, 0, 1]).unwrap(),
        }
    }

    #[test]
    fn test_header_is_fixed_size() {
        assert_eq!(HEADER_LEN, 72);
    }

    #[test]
    fn test_final_summary_survives_encoding() {
        let summary = FinalSummary {
            checksum: 5,
            alive_cells: 5,
            elapsed_seconds: 1.25,
        };
        let decoded = Snapshot::from_bytes(&sample(Some(summary)).to_bytes()).unwrap();
        assert!(decoded.is_final());
        assert_eq!(decoded.summary, Some(summary));
        assert_eq!(decoded.grid.alive_cells(), 5);

        let plain = Snapshot::from_bytes(&sample(None).to_bytes()).unwrap();
        assert!(!plain.is_final());
        assert_eq!(plain.step, 42);
        assert_eq!(plain.seed, 9);
    }

    #[test]
    fn test_rejects_malformed() {
        let bytes = sample(None).to_bytes();
        assert!(Snapshot::from_bytes(&bytes[..10]).is_err());
        assert!(Snapshot::from_bytes(&bytes[..bytes.len() - 1]).is_err());

        let mut bad_magic = bytes.clone();
        bad_magic[0] ^= 0xFF;
        assert!(matches!(
            Snapshot::from_bytes(&bad_magic),
            Err(RingLifeError::Snapshot(_))
        ));
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        let mut bytes = sample(None).to_bytes();
        // nx and ny at offsets 8 and 16
        bytes[8..16].copy_from_slice(&(u64::MAX / 2).to_le_bytes());
        bytes[16..24].copy_from_slice(&4u64.to_le_bytes());
        assert!(matches!(
            Snapshot::from_bytes(&bytes),
            Err(RingLifeError::Snapshot(_))
        ));
    }

    #[test]
    fn test_file_writer() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let mut writer = FileSnapshotWriter::new(&out);
        writer.write(&sample(None)).unwrap();

        let path = snapshot_path(&out, 42);
        assert!(path.ends_with("step_000042.rls"));
        assert_eq!(read_snapshot(&path).unwrap(), sample(None));
    }

    #[test]
    fn test_memory_writer_shares_store() {
        let writer = MemorySnapshotWriter::new();
        let mut handle = writer.clone();
        handle.write(&sample(None)).unwrap();
        assert_eq!(writer.steps(), vec![42]);
    }
}
