//! Cluster launcher.
//!
//! Spawns one tokio task per worker, all running the same [`Worker`] loop
//! over a shared W2W broker. The first worker to fail aborts the rest: a
//! partially updated grid is never a valid result.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument, Level};

use ringlife_core::{Phase, Result, RingLifeError, Role, Transport, W2WBuilder, WorkerId};

use crate::collector::RunReport;
use crate::config::RunConfig;
use crate::snapshot::SnapshotWriter;
use crate::worker::{Worker, WorkerOutcome};

/// Rank that gathers, reduces and writes outputs.
pub const COORDINATOR: WorkerId = WorkerId(0);

/// Launches and joins the workers of a run.
#[derive(Debug, Clone)]
pub struct Cluster {
    config: Arc<RunConfig>,
}

impl Cluster {
    /// Validate `config` and prepare a cluster for it.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Configuration every worker receives.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run without taking snapshots.
    pub async fn run(&self) -> Result<RunReport> {
        self.launch(None).await
    }

    /// Run, handing snapshots to `writer` on the coordinator.
    pub async fn run_with_writer(&self, writer: Box<dyn SnapshotWriter>) -> Result<RunReport> {
        self.launch(Some(writer)).await
    }

    async fn launch(&self, mut writer: Option<Box<dyn SnapshotWriter>>) -> Result<RunReport> {
        let config = &self.config;
        let workers = config.workers;
        let collect_snapshots = writer.is_some();

        info!(
            workers,
            nx = config.nx,
            ny = config.ny,
            steps = config.steps,
            pattern = %config.pattern,
            init_mode = %config.init_mode,
            "starting run"
        );

        let broker = W2WBuilder::new()
            .world_size(workers)
            .max_pending_messages(config.queue_capacity)
            .enable_tracing(tracing::enabled!(Level::TRACE))
            .build();

        // Every endpoint exists before any worker sends.
        let endpoints: Vec<_> = (0..workers).map(|r| broker.register(WorkerId(r))).collect();

        let mut tasks = JoinSet::new();
        for endpoint in endpoints {
            let id = endpoint.rank();
            let role = Role::for_rank(id, COORDINATOR);
            let mut worker = Worker::new(endpoint, role, Arc::clone(config))
                .collect_snapshots(collect_snapshots);
            if role.is_coordinator() {
                if let Some(writer) = writer.take() {
                    worker = worker.snapshot_writer(writer);
                }
            }

            let phase = worker.phase_tracker();
            let span = info_span!("worker", worker = id.index());
            tasks.spawn(async move {
                let outcome = AssertUnwindSafe(worker.run().instrument(span))
                    .catch_unwind()
                    .await;
                (id, phase.current(), outcome)
            });
        }

        let mut report = None;
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((_, _, Ok(Ok(outcome)))) => {
                    report = report.or(collect(outcome));
                    continue;
                }
                Ok((_, _, Ok(Err(e)))) => e,
                Ok((id, phase, Err(panic))) => RingLifeError::WorkerFailed {
                    worker: id,
                    phase,
                    message: format!("worker panicked: {}", panic_message(panic.as_ref())),
                },
                Err(join) => RingLifeError::WorkerFailed {
                    worker: COORDINATOR,
                    phase: Phase::Init,
                    message: format!("worker task failed: {}", join),
                },
            };

            error!(error = %failure, "aborting run");
            tasks.abort_all();
            return Err(failure);
        }

        report.ok_or_else(|| RingLifeError::WorkerFailed {
            worker: COORDINATOR,
            phase: Phase::Reduce,
            message: "coordinator produced no report".to_string(),
        })
    }
}

fn collect(outcome: WorkerOutcome) -> Option<RunReport> {
    tracing::debug!(
        worker = %outcome.worker,
        local_alive = outcome.local_alive,
        "worker finished"
    );
    outcome.report
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Validate `config` and run it without snapshots.
pub async fn run(config: RunConfig) -> Result<RunReport> {
    Cluster::new(config)?.run().await
}
