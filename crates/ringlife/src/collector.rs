//! Checksum and benchmark collection.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use ringlife_core::collective::all_reduce_sum;
use ringlife_core::{Phase, Result, Role, Transport};

use crate::local::LocalGrid;
use crate::pattern::PatternKind;

/// Accumulates time over several timed sections.
///
/// Only the exchange and kernel sections of a run are timed; snapshot
/// gathering and I/O happen while the stopwatch is stopped.
#[derive(Debug, Default)]
pub struct Stopwatch {
    accumulated: Duration,
    started: Option<Instant>,
}

impl Stopwatch {
    /// Stopped stopwatch at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing; no-op if already running.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Stop timing and add the section to the total.
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    /// Whether a section is being timed.
    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Total time, including a running section.
    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }
}

/// Sum every worker's interior alive cells. All workers get the total.
pub async fn global_checksum<T: Transport + ?Sized>(
    transport: &mut T,
    role: Role,
    sequence: u64,
    grid: &LocalGrid,
) -> Result<u64> {
    let me = transport.rank();
    all_reduce_sum(transport, role, sequence, grid.alive_count())
        .await
        .map_err(|e| e.with_context(me, Phase::Reduce))
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Worker count.
    pub workers: usize,
    /// Grid width.
    pub nx: usize,
    /// Grid height.
    pub ny: usize,
    /// Generations completed.
    pub generations: u64,
    /// Timed exchange and kernel seconds.
    pub elapsed_seconds: f64,
    /// Global alive-cell count at the final generation.
    pub checksum: u64,
    /// Alive cells at the final generation.
    pub alive_cells: u64,
    /// Initial pattern.
    pub pattern: PatternKind,
    /// Seed.
    pub seed: u64,
}

impl RunReport {
    /// Seconds per generation; zero for an empty run.
    pub fn time_per_step(&self) -> f64 {
        if self.generations == 0 {
            0.0
        } else {
            self.elapsed_seconds / self.generations as f64
        }
    }

    /// Fraction of cells alive, in percent.
    pub fn alive_percent(&self) -> f64 {
        let cells = (self.nx * self.ny) as f64;
        if cells == 0.0 {
            0.0
        } else {
            self.alive_cells as f64 * 100.0 / cells
        }
    }

    /// Machine-parseable single-line report.
    pub fn benchmark_line(&self) -> String {
        format!(
            "BENCHMARK: ranks={}, grid={}x{}, steps={}, time={:.6}, time_per_step={:.6}, checksum={}",
            self.workers,
            self.nx,
            self.ny,
            self.generations,
            self.elapsed_seconds,
            self.time_per_step(),
            self.checksum
        )
    }

    /// JSON encoding of the report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Completed {} steps on {}x{} grid with {} workers",
            self.generations, self.nx, self.ny, self.workers
        )?;
        writeln!(f, "  Pattern:       {} (seed {})", self.pattern, self.seed)?;
        writeln!(f, "  Elapsed:       {:.3} s", self.elapsed_seconds)?;
        writeln!(f, "  Per step:      {:.3} ms", self.time_per_step() * 1000.0)?;
        writeln!(f, "  Checksum:      {}", self.checksum)?;
        write!(
            f,
            "  Alive cells:   {} ({:.4}%)",
            self.alive_cells,
            self.alive_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            workers: 4,
            nx: 128,
            ny: 64,
            generations: 10,
            elapsed_seconds: 0.5,
            checksum: 1024,
            alive_cells: 1024,
            pattern: PatternKind::Glider,
            seed: 42,
        }
    }

    #[test]
    fn test_benchmark_line() {
        assert_eq!(
            report().benchmark_line(),
            "BENCHMARK: ranks=4, grid=128x64, steps=10, time=0.500000, time_per_step=0.050000, checksum=1024"
        );
    }

    #[test]
    fn test_zero_generations() {
        let mut r = report();
        r.generations = 0;
        r.elapsed_seconds = 0.0;
        assert_eq!(r.time_per_step(), 0.0);
        assert!(r.benchmark_line().contains("time_per_step=0.000000"));
    }

    #[test]
    fn test_summary_and_json() {
        let r = report();
        let text = r.to_string();
        assert!(text.contains("Completed 10 steps"));
        assert!(text.contains("Checksum:      1024"));
        assert!(text.contains("12.5000%"));

        let json: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(json["checksum"], 1024);
        assert_eq!(json["pattern"], "glider");
    }

    #[test]
    fn test_stopwatch_accumulates_sections() {
        let mut watch = Stopwatch::new();
        assert_eq!(watch.elapsed(), Duration::ZERO);

        watch.start();
        std::thread::sleep(Duration::from_millis(5));
        watch.stop();
        let first = watch.elapsed();
        assert!(first >= Duration::from_millis(5));

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(watch.elapsed(), first);
        assert!(!watch.is_running());

        watch.start();
        watch.stop();
        assert!(watch.elapsed() >= first);
    }
}
