//! # RingLife
//!
//! Distributed Conway's Game of Life on a toroidal grid.
//!
//! The grid is split into contiguous row bands, one per worker. Workers are
//! symmetric peers running the same loop: exchange boundary rows with the two
//! ring neighbors, then apply the birth-3/survive-2-or-3 rule to the owned
//! rows. After the last generation the alive cells are summed into a checksum
//! that is identical for every worker count.
//!
//! ## Modules
//!
//! - [`partition`] - row ranges and ring neighbors
//! - [`pattern`] - position-addressable initial patterns
//! - [`distributor`] - initial buffers and grid reassembly
//! - [`halo`] - per-generation boundary row exchange
//! - [`kernel`] - the local step kernel
//! - [`collector`] - checksum, timing and reports
//! - [`snapshot`] - snapshot artifacts and writers
//! - [`cluster`] - launches and joins the workers of a run
//!
//! ## Example
//!
//! ```ignore
//! use ringlife::prelude::*;
//!
//! let config = RunConfigBuilder::new()
//!     .grid(128, 128)
//!     .steps(10)
//!     .pattern(PatternKind::Glider)
//!     .workers(4)
//!     .build()?;
//! let report = Cluster::new(config)?.run().await?;
//! println!("{}", report.benchmark_line());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod collector;
pub mod config;
pub mod distributor;
pub mod halo;
pub mod kernel;
pub mod local;
pub mod partition;
pub mod pattern;
pub mod rng;
pub mod snapshot;
pub mod worker;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cluster::{run, Cluster, COORDINATOR};
    pub use crate::collector::{RunReport, Stopwatch};
    pub use crate::config::{load_config, RunConfig, RunConfigBuilder};
    pub use crate::distributor::{GlobalGrid, InitMode};
    pub use crate::halo::HaloExchange;
    pub use crate::local::LocalGrid;
    pub use crate::partition::{plan_rows, RingNeighbors, RowRange};
    pub use crate::pattern::{Pattern, PatternGenerator, PatternKind};
    pub use crate::snapshot::{
        read_snapshot, FileSnapshotWriter, MemorySnapshotWriter, Snapshot, SnapshotWriter,
    };
    pub use crate::worker::{PhaseTracker, Worker, WorkerOutcome};
    pub use ringlife_core::prelude::*;
}

pub use cluster::Cluster;
pub use collector::RunReport;
pub use config::{RunConfig, RunConfigBuilder};
pub use pattern::{Pattern, PatternKind};
pub use ringlife_core::{Result, RingLifeError};
