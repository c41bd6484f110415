//! The SPMD worker loop.
//!
//! Every worker of a run executes [`Worker::run`] with the same
//! configuration. Per generation the loop is exchange, then step; the
//! exchange completes before the kernel reads a ghost row, so no worker can
//! run more than one generation ahead of a neighbor's rows.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use ringlife_core::collective::{barrier, broadcast_u64};
use ringlife_core::{Phase, Result, Role, Transport, WorkerId};

use crate::collector::{global_checksum, RunReport, Stopwatch};
use crate::config::RunConfig;
use crate::distributor::{gather_grid, initialize};
use crate::halo::HaloExchange;
use crate::local::LocalGrid;
use crate::snapshot::{FinalSummary, Snapshot, SnapshotWriter};

/// Result of one worker's run.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    /// Worker that produced it.
    pub worker: WorkerId,
    /// Global checksum; identical on every worker.
    pub checksum: u64,
    /// Alive cells in this worker's partition.
    pub local_alive: u64,
    /// Timed exchange and kernel time as seen by this worker.
    pub elapsed: Duration,
    /// Full report, present on the coordinator only.
    pub report: Option<RunReport>,
}

/// Shared view of the phase a worker is in.
///
/// The launcher keeps a clone so a panicking worker can be reported with the
/// phase it panicked in.
#[derive(Debug, Clone)]
pub struct PhaseTracker(Arc<Mutex<Phase>>);

impl PhaseTracker {
    /// Tracker starting in [`Phase::Init`].
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Phase::Init)))
    }

    /// Phase last entered.
    pub fn current(&self) -> Phase {
        *self.0.lock()
    }

    fn enter(&self, phase: Phase) {
        *self.0.lock() = phase;
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// One worker of a run.
pub struct Worker<T: Transport> {
    transport: T,
    role: Role,
    config: Arc<RunConfig>,
    collect_snapshots: bool,
    writer: Option<Box<dyn SnapshotWriter>>,
    collective_seq: u64,
    phase: PhaseTracker,
}

impl<T: Transport> Worker<T> {
    /// Create a worker. Snapshots are off until enabled.
    pub fn new(transport: T, role: Role, config: Arc<RunConfig>) -> Self {
        Self {
            transport,
            role,
            config,
            collect_snapshots: false,
            writer: None,
            collective_seq: 0,
            phase: PhaseTracker::new(),
        }
    }

    /// Take part in snapshot gathers. Must be the same on every worker.
    pub fn collect_snapshots(mut self, enabled: bool) -> Self {
        self.collect_snapshots = enabled;
        self
    }

    /// Give the coordinator a writer for gathered snapshots.
    pub fn snapshot_writer(mut self, writer: Box<dyn SnapshotWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// This worker's rank.
    pub fn id(&self) -> WorkerId {
        self.transport.rank()
    }

    /// Handle on the phase this worker is in.
    pub fn phase_tracker(&self) -> PhaseTracker {
        self.phase.clone()
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.collective_seq;
        self.collective_seq += 1;
        seq
    }

    /// Run every generation and the final reduction.
    pub async fn run(mut self) -> Result<WorkerOutcome> {
        let id = self.id();
        let config = Arc::clone(&self.config);
        let workers = self.transport.world_size();

        self.phase.enter(Phase::Init);
        let generator = config
            .resolved_pattern()
            .generator(config.nx, config.ny)
            .map_err(|e| e.with_context(id, Phase::Init))?;
        let seq = self.next_seq();
        let mut grid = initialize(
            &mut self.transport,
            self.role,
            seq,
            &generator,
            config.init_mode,
        )
        .await?;

        debug!(
            worker = %id,
            rows = grid.row_count(),
            start = grid.range().start,
            alive = grid.alive_count(),
            "partition initialized"
        );

        // With no generations the final snapshot doubles as the initial one.
        if config.steps > 0 && config.is_snapshot_step(0) {
            self.snapshot(&grid, 0, None).await?;
        }

        let halo = HaloExchange::new(id, workers);
        let mut watch = Stopwatch::new();
        watch.start();

        for generation in 0..config.steps {
            self.phase.enter(Phase::Exchange);
            halo.exchange(&mut self.transport, &mut grid, generation)
                .await?;
            self.phase.enter(Phase::Kernel);
            grid.step()?;

            let done = generation + 1;
            if done < config.steps && config.is_snapshot_step(done) {
                watch.stop();
                self.snapshot(&grid, done, None).await?;
                watch.start();
            }
        }

        self.phase.enter(Phase::Reduce);
        let seq = self.next_seq();
        barrier(&mut self.transport, self.role, seq)
            .await
            .map_err(|e| e.with_context(id, Phase::Reduce))?;
        watch.stop();

        let seq = self.next_seq();
        let checksum = global_checksum(&mut self.transport, self.role, seq, &grid).await?;
        let elapsed = watch.elapsed();

        self.snapshot(
            &grid,
            config.steps,
            Some(FinalSummary {
                checksum,
                alive_cells: checksum,
                elapsed_seconds: elapsed.as_secs_f64(),
            }),
        )
        .await?;

        let report = self.role.is_coordinator().then(|| RunReport {
            workers,
            nx: config.nx,
            ny: config.ny,
            generations: config.steps,
            elapsed_seconds: elapsed.as_secs_f64(),
            checksum,
            alive_cells: checksum,
            pattern: config.pattern,
            seed: config.seed,
        });

        if self.role.is_coordinator() {
            info!(
                generations = config.steps,
                checksum,
                elapsed_ms = elapsed.as_millis() as u64,
                "run complete"
            );
        }

        Ok(WorkerOutcome {
            worker: id,
            checksum,
            local_alive: grid.alive_count(),
            elapsed,
            report,
        })
    }

    /// Gather the grid and hand it to the writer, if snapshots are enabled.
    ///
    /// Participants wait for the coordinator to release them once their rows
    /// have arrived, so no worker posts a second gather before the first one
    /// is drained and the coordinator's queue holds at most one gather part
    /// per peer.
    async fn snapshot(
        &mut self,
        grid: &LocalGrid,
        step: u64,
        summary: Option<FinalSummary>,
    ) -> Result<()> {
        if !self.collect_snapshots {
            return Ok(());
        }

        self.phase.enter(Phase::Gather);
        let id = self.id();
        let seq = self.next_seq();
        let gathered = gather_grid(&mut self.transport, self.role, seq, grid, self.config.ny).await?;

        let seq = self.next_seq();
        broadcast_u64(&mut self.transport, self.role, seq, step)
            .await
            .map_err(|e| e.with_context(id, Phase::Gather))?;

        self.phase.enter(Phase::Snapshot);

        if let (Some(grid), Some(writer)) = (gathered, self.writer.as_mut()) {
            let snapshot = Snapshot {
                step,
                pattern: self.config.pattern,
                seed: self.config.seed,
                summary,
                grid,
            };
            writer
                .write(&snapshot)
                .map_err(|e| e.with_context(id, Phase::Snapshot))?;
            debug!(worker = %id, step, "snapshot taken");
        }
        Ok(())
    }
}
