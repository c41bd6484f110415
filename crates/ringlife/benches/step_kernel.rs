//! Step Kernel and Full-Run Benchmarks
//!
//! Measures:
//! - Single-partition kernel throughput (sequential and rayon paths)
//! - Halo exchange round trips between workers
//! - Complete multi-worker runs through the cluster launcher

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime as TokioRuntime;

use ringlife::config::RunConfigBuilder;
use ringlife::halo::HaloExchange;
use ringlife::kernel;
use ringlife::local::LocalGrid;
use ringlife::partition::plan_rows;
use ringlife::pattern::{Pattern, PatternKind};
use ringlife::Cluster;
use ringlife_core::{W2WBuilder, WorkerId};

/// Random soup with ghost rows, ready for `kernel::step`
fn soup(nx: usize, rows: usize) -> Vec<u8> {
    let gen = Pattern::Random(42).generator(nx, rows + 2).unwrap();
    gen.rows(0, rows + 2)
}

/// Benchmark the local step kernel across partition sizes
fn bench_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel/step");

    for &(nx, rows) in [(128, 128), (256, 256), (1024, 256), (2048, 512)].iter() {
        let src = soup(nx, rows);
        let mut dst = vec![0u8; src.len()];
        group.throughput(Throughput::Elements((nx * rows) as u64));

        group.bench_with_input(
            BenchmarkId::new("cells", format!("{}x{}", nx, rows)),
            &(nx, rows),
            |b, &(nx, rows)| {
                b.iter(|| {
                    kernel::step(black_box(&src), &mut dst, nx, rows);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark one halo exchange on a two-worker ring
fn bench_halo(c: &mut Criterion) {
    let mut group = c.benchmark_group("halo/exchange");
    group.sample_size(50);

    let rt = TokioRuntime::new().unwrap();

    for &nx in [256usize, 4096].iter() {
        group.throughput(Throughput::Bytes((nx * 4) as u64));

        group.bench_with_input(BenchmarkId::new("two_workers", nx), &nx, |b, &nx| {
            let broker = W2WBuilder::new().world_size(2).build();
            let ranges = plan_rows(8, 2).unwrap();
            let mut left = broker.register(WorkerId(0));
            let mut right = broker.register(WorkerId(1));
            let mut left_grid = LocalGrid::new(WorkerId(0), nx, ranges[0]);
            let mut right_grid = LocalGrid::new(WorkerId(1), nx, ranges[1]);
            let left_halo = HaloExchange::new(WorkerId(0), 2);
            let right_halo = HaloExchange::new(WorkerId(1), 2);
            let mut generation = 0u64;

            b.iter(|| {
                rt.block_on(async {
                    let pending_left = left_halo.post(&mut left, &left_grid, generation).unwrap();
                    let pending_right =
                        right_halo.post(&mut right, &right_grid, generation).unwrap();
                    pending_left.complete(&mut left, &mut left_grid).await.unwrap();
                    pending_right
                        .complete(&mut right, &mut right_grid)
                        .await
                        .unwrap();
                });
                generation += 1;
            });
        });
    }

    group.finish();
}

/// Benchmark complete runs with varying worker counts
fn bench_cluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster/run");
    group.sample_size(10);

    let rt = TokioRuntime::new().unwrap();

    for &workers in [1usize, 2, 4, 8].iter() {
        let config = RunConfigBuilder::new()
            .grid(512, 512)
            .steps(20)
            .pattern(PatternKind::Random)
            .workers(workers)
            .build()
            .unwrap();
        let cluster = Cluster::new(config).unwrap();

        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, _| {
            b.iter(|| {
                let report = rt.block_on(cluster.run()).unwrap();
                black_box(report.checksum);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernel, bench_halo, bench_cluster);
criterion_main!(benches);
