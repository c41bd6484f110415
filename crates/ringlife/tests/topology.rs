//! Toroidal wrap and partition seams.

use ringlife::config::RunConfigBuilder;
use ringlife::distributor::GlobalGrid;
use ringlife::kernel::step_torus;
use ringlife::local::LocalGrid;
use ringlife::partition::plan_rows;
use ringlife::pattern::{Pattern, PatternKind};
use ringlife::snapshot::MemorySnapshotWriter;
use ringlife::Cluster;
use ringlife_core::WorkerId;

/// `grid` shifted by `(shift, shift)` on the torus.
fn shifted(grid: &GlobalGrid, shift: usize) -> GlobalGrid {
    let mut cells = vec![0u8; grid.cells.len()];
    for r in 0..grid.ny {
        for c in 0..grid.nx {
            cells[((r + shift) % grid.ny) * grid.nx + (c + shift) % grid.nx] = grid.get(r, c);
        }
    }
    GlobalGrid::new(grid.nx, grid.ny, cells).unwrap()
}

#[tokio::test]
async fn test_glider_wraps_across_both_edges() {
    // 16x16: the glider starts at (10, 10) and crosses the bottom-right corner
    // within 32 generations.
    for workers in [1, 2, 4] {
        let config = RunConfigBuilder::new()
            .grid(16, 16)
            .steps(32)
            .save_interval(4)
            .pattern(PatternKind::Glider)
            .workers(workers)
            .build()
            .unwrap();
        let store = MemorySnapshotWriter::new();
        Cluster::new(config)
            .unwrap()
            .run_with_writer(Box::new(store.clone()))
            .await
            .unwrap();

        let snapshots = store.snapshots();
        assert_eq!(
            store.steps(),
            vec![0, 4, 8, 12, 16, 20, 24, 28, 32],
            "workers = {}",
            workers
        );

        let initial = &snapshots[0].grid;
        for snapshot in &snapshots {
            let shift = (snapshot.step / 4) as usize;
            assert_eq!(
                snapshot.grid,
                shifted(initial, shift),
                "step {} with {} workers",
                snapshot.step,
                workers
            );
        }
    }
}

#[tokio::test]
async fn test_glider_gun_across_seam_matches_single_worker() {
    // Gun occupies rows 20..29; with 48 rows the two-worker seam is row 24.
    let mut results = Vec::new();
    for workers in [1, 2, 3] {
        let config = RunConfigBuilder::new()
            .grid(64, 48)
            .steps(60)
            .save_interval(0)
            .pattern(PatternKind::GliderGun)
            .workers(workers)
            .build()
            .unwrap();
        let ranges = plan_rows(config.ny, workers).unwrap();
        if workers == 2 {
            assert_eq!(ranges[1].start, 24);
        }

        let store = MemorySnapshotWriter::new();
        let report = Cluster::new(config)
            .unwrap()
            .run_with_writer(Box::new(store.clone()))
            .await
            .unwrap();
        let final_grid = store.snapshots().pop().unwrap().grid;
        results.push((report.checksum, final_grid));
    }

    let gen = Pattern::GliderGun.generator(64, 48).unwrap();
    let mut expected = GlobalGrid::generate(&gen);
    for _ in 0..60 {
        expected.cells = step_torus(&expected.cells, 64, 48);
    }

    for (checksum, grid) in &results {
        assert_eq!(*checksum, expected.alive_cells());
        assert_eq!(grid, &expected);
    }
}

#[test]
fn test_generator_independent_of_decomposition() {
    let patterns = [
        Pattern::Glider,
        Pattern::GliderGun,
        Pattern::RPentomino,
        Pattern::Random(42),
        Pattern::Random(7),
    ];

    for pattern in patterns {
        let gen = pattern.generator(96, 50).unwrap();
        let whole = GlobalGrid::generate(&gen);

        for workers in 1..=8 {
            let pieced: Vec<u8> = plan_rows(50, workers)
                .unwrap()
                .into_iter()
                .enumerate()
                .flat_map(|(rank, range)| {
                    LocalGrid::generate(WorkerId(rank), range, &gen)
                        .interior()
                        .to_vec()
                })
                .collect();
            assert_eq!(pieced, whole.cells, "{:?} with {} workers", pattern, workers);
        }

        // A second generator for the same inputs is byte-identical
        let again = GlobalGrid::generate(&pattern.generator(96, 50).unwrap());
        assert_eq!(again, whole);
    }
}
