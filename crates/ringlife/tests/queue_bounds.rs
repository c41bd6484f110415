//! Runs at the smallest queue capacity `validate` accepts.
//!
//! Snapshots are the one place where participants could otherwise run ahead
//! of the coordinator and pile up messages in its queue. A slow writer makes
//! that window as wide as possible.

use std::thread;
use std::time::Duration;

use ringlife::config::RunConfigBuilder;
use ringlife::distributor::GlobalGrid;
use ringlife::kernel::step_torus;
use ringlife::pattern::PatternKind;
use ringlife::snapshot::{MemorySnapshotWriter, Snapshot, SnapshotWriter};
use ringlife::{Cluster, Result};

/// Delays every write before storing the snapshot.
struct SlowWriter {
    delay: Duration,
    inner: MemorySnapshotWriter,
}

impl SnapshotWriter for SlowWriter {
    fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        thread::sleep(self.delay);
        self.inner.write(snapshot)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_workers_every_step_with_slow_writer() {
    let workers = 100;
    let steps = 40;
    let config = RunConfigBuilder::new()
        .grid(16, 100)
        .steps(steps)
        .save_interval(1)
        .pattern(PatternKind::Random)
        .seed(3)
        .workers(workers)
        .queue_capacity(workers + 4)
        .build()
        .unwrap();

    let store = MemorySnapshotWriter::new();
    let report = Cluster::new(config.clone())
        .unwrap()
        .run_with_writer(Box::new(SlowWriter {
            delay: Duration::from_millis(20),
            inner: store.clone(),
        }))
        .await
        .unwrap();

    assert_eq!(store.steps(), (0..=steps).collect::<Vec<_>>());

    let gen = config
        .resolved_pattern()
        .generator(config.nx, config.ny)
        .unwrap();
    let mut expected = GlobalGrid::generate(&gen);
    for _ in 0..steps {
        expected.cells = step_torus(&expected.cells, expected.nx, expected.ny);
    }
    assert_eq!(report.checksum, expected.alive_cells());
    assert_eq!(store.snapshots().pop().unwrap().grid, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scatter_init_at_minimum_capacity() {
    let workers = 32;
    let config = RunConfigBuilder::new()
        .grid(24, 64)
        .steps(10)
        .save_interval(3)
        .pattern(PatternKind::GliderGun)
        .workers(workers)
        .init_mode(ringlife::distributor::InitMode::Scatter)
        .queue_capacity(workers + 4)
        .build()
        .unwrap();

    let store = MemorySnapshotWriter::new();
    Cluster::new(config)
        .unwrap()
        .run_with_writer(Box::new(store.clone()))
        .await
        .unwrap();
    assert_eq!(store.steps(), vec![0, 3, 6, 9, 10]);
}
