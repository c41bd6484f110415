//! `ringlife run` command - Run a simulation.

use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::debug;

use ringlife::config::{RunConfig, RunConfigBuilder};
use ringlife::distributor::InitMode;
use ringlife::pattern::PatternKind;
use ringlife::snapshot::FileSnapshotWriter;
use ringlife::Cluster;

use crate::error::CliResult;

/// Values given on the command line; each one overrides the loaded config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Grid width.
    pub nx: Option<usize>,
    /// Grid height.
    pub ny: Option<usize>,
    /// Generations.
    pub steps: Option<u64>,
    /// Seed.
    pub seed: Option<u64>,
    /// Initial pattern.
    pub pattern: Option<PatternKind>,
    /// Snapshot directory.
    pub output_dir: Option<PathBuf>,
    /// Snapshot interval.
    pub save_interval: Option<u64>,
    /// Benchmark line instead of the summary.
    pub benchmark: bool,
    /// Worker count.
    pub workers: Option<usize>,
    /// Initial distribution mode.
    pub init_mode: Option<InitMode>,
}

/// Output options.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Skip snapshot files entirely.
    pub no_snapshots: bool,
    /// Print the report as JSON.
    pub json: bool,
    /// Suppress progress lines.
    pub quiet: bool,
}

/// Load the configuration file (or environment only), apply overrides, then
/// validate the result once.
pub fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> CliResult<RunConfig> {
    let mut builder = match path {
        Some(path) => RunConfigBuilder::from_file(path)?,
        None => RunConfigBuilder::from_env()?,
    };

    if let Some(nx) = overrides.nx {
        builder = builder.width(nx);
    }
    if let Some(ny) = overrides.ny {
        builder = builder.height(ny);
    }
    if let Some(steps) = overrides.steps {
        builder = builder.steps(steps);
    }
    if let Some(seed) = overrides.seed {
        builder = builder.seed(seed);
    }
    if let Some(pattern) = overrides.pattern {
        builder = builder.pattern(pattern);
    }
    if let Some(dir) = &overrides.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(interval) = overrides.save_interval {
        builder = builder.save_interval(interval);
    }
    if overrides.benchmark {
        builder = builder.benchmark(true);
    }
    if let Some(workers) = overrides.workers {
        builder = builder.workers(workers);
    }
    if let Some(mode) = overrides.init_mode {
        builder = builder.init_mode(mode);
    }

    Ok(builder.build()?)
}

/// Execute the run command.
pub async fn execute(config: RunConfig, output: OutputOptions) -> CliResult<()> {
    let chatty = !config.benchmark && !output.quiet && !output.json;
    debug!(?config, "resolved configuration");

    if chatty {
        println!(
            "Initialized {} pattern on {}x{} grid",
            config.pattern.to_string().bright_white(),
            config.nx,
            config.ny
        );
        println!(
            "Running with {} workers for {} steps",
            config.workers.to_string().bright_white(),
            config.steps
        );
        if !output.no_snapshots {
            println!(
                "Saving snapshots to '{}/' every {} steps",
                config.output_dir.display(),
                config.save_interval
            );
        }
    }

    let cluster = Cluster::new(config.clone())?;
    let report = if output.no_snapshots {
        cluster.run().await?
    } else {
        cluster
            .run_with_writer(Box::new(FileSnapshotWriter::new(&config.output_dir)))
            .await?
    };

    if config.benchmark {
        println!("{}", report.benchmark_line());
    } else if output.json {
        println!("{}", report.to_json()?);
    } else if !output.quiet {
        println!();
        println!("{} {}", "✓".green(), report);
        if !output.no_snapshots {
            println!(
                "\nSnapshots saved to: {}",
                format!("{}/", config.output_dir.display()).cyan()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_apply_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "nx = 64\nny = 64\nsteps = 10\npattern = \"random\"").unwrap();

        let overrides = Overrides {
            ny: Some(32),
            steps: Some(3),
            workers: Some(4),
            benchmark: true,
            ..Overrides::default()
        };
        let config = resolve_config(Some(file.path()), &overrides).unwrap();
        assert_eq!((config.nx, config.ny), (64, 32));
        assert_eq!(config.steps, 3);
        assert_eq!(config.workers, 4);
        assert_eq!(config.pattern, PatternKind::Random);
        assert!(config.benchmark);
    }

    #[test]
    fn test_overrides_repair_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "ny = 8\nworkers = 16").unwrap();

        let overrides = Overrides {
            ny: Some(64),
            ..Overrides::default()
        };
        let config = resolve_config(Some(file.path()), &overrides).unwrap();
        assert_eq!((config.ny, config.workers), (64, 16));

        assert!(resolve_config(Some(file.path()), &Overrides::default()).is_err());
    }

    #[test]
    fn test_overrides_are_validated() {
        let overrides = Overrides {
            ny: Some(2),
            workers: Some(3),
            ..Overrides::default()
        };
        assert!(resolve_config(None, &overrides).is_err());
    }
}
