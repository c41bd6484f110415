//! Run configuration.
//!
//! Configuration is loaded with the `config` crate from a TOML file layered
//! under `RINGLIFE_*` environment variables. Every worker of a run receives
//! an identical copy.
//!
//! # Example
//!
//! ```ignore
//! use ringlife::config::{load_config, RunConfigBuilder};
//!
//! let config = load_config("ringlife.toml")?;
//! let small = RunConfigBuilder::new().grid(128, 128).steps(10).build()?;
//! ```

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use ringlife_core::{Result, RingLifeError};

use crate::distributor::InitMode;
use crate::pattern::{Pattern, PatternKind};

/// Prefix of environment variables overriding file values.
pub const ENV_PREFIX: &str = "RINGLIFE";

/// Messages a worker may need to hold beyond one per peer: two halo rows per
/// neighbor for the current and the next generation.
const HALO_HEADROOM: usize = 4;

/// Configuration shared by every worker of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Grid width.
    pub nx: usize,
    /// Grid height.
    pub ny: usize,
    /// Generations to run.
    pub steps: u64,
    /// Initial pattern.
    pub pattern: PatternKind,
    /// Seed for the random pattern.
    pub seed: u64,
    /// Generations between snapshots; 0 writes only the final one.
    pub save_interval: u64,
    /// Directory snapshots are written to.
    pub output_dir: PathBuf,
    /// Print the machine-readable benchmark line.
    pub benchmark: bool,
    /// Number of workers.
    pub workers: usize,
    /// How initial rows reach the workers.
    pub init_mode: InitMode,
    /// Per-worker message queue capacity.
    pub queue_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            nx: 16384,
            ny: 16384,
            steps: 2000,
            pattern: PatternKind::GliderGun,
            seed: 42,
            save_interval: 100,
            output_dir: PathBuf::from("snapshots"),
            benchmark: false,
            workers: 1,
            init_mode: InitMode::Local,
            queue_capacity: 1024,
        }
    }
}

impl RunConfig {
    /// Load from a TOML file, then apply `RINGLIFE_*` environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = read_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `RINGLIFE_*` environment overrides only.
    pub fn from_env() -> Result<Self> {
        let config = read_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved pattern with the seed bound.
    pub fn resolved_pattern(&self) -> Pattern {
        self.pattern.with_seed(self.seed)
    }

    /// Whether a snapshot is taken after `generation`.
    ///
    /// The final generation always is. With a positive `save_interval`, so
    /// are generation 0 and every multiple of the interval; an interval of 0
    /// leaves only the final snapshot.
    pub fn is_snapshot_step(&self, generation: u64) -> bool {
        generation == self.steps
            || (self.save_interval > 0 && generation % self.save_interval == 0)
    }

    /// Check the configuration before any worker starts.
    pub fn validate(&self) -> Result<()> {
        if self.nx == 0 || self.ny == 0 {
            return Err(RingLifeError::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                self.nx, self.ny
            )));
        }
        if self.workers == 0 {
            return Err(RingLifeError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.workers > self.ny {
            return Err(RingLifeError::TooManyWorkers {
                workers: self.workers,
                rows: self.ny,
            });
        }
        if self.queue_capacity < self.workers + HALO_HEADROOM {
            return Err(RingLifeError::InvalidConfig(format!(
                "queue capacity {} too small for {} workers (need at least {})",
                self.queue_capacity,
                self.workers,
                self.workers + HALO_HEADROOM
            )));
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn read_file(path: &Path) -> Result<RunConfig> {
    Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml))
        .add_source(env_source())
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| RingLifeError::InvalidConfig(e.to_string()))
}

fn read_env() -> Result<RunConfig> {
    Config::builder()
        .add_source(env_source())
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| RingLifeError::InvalidConfig(e.to_string()))
}

/// Load configuration from a TOML file with environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    RunConfig::load(path)
}

/// Load configuration from a TOML string with environment overrides.
pub fn load_config_from_str(content: &str) -> Result<RunConfig> {
    let config: RunConfig = Config::builder()
        .add_source(File::from_str(content, FileFormat::Toml))
        .add_source(env_source())
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| RingLifeError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Builder for programmatic configuration.
#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: RunConfig) -> Self {
        Self { config }
    }

    /// Start from a TOML file plus environment overrides.
    ///
    /// Nothing is validated until [`RunConfigBuilder::build`], so later
    /// setters can repair values the file alone would fail on.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_file(path.as_ref()).map(Self::from_config)
    }

    /// Start from the defaults plus environment overrides, unvalidated.
    pub fn from_env() -> Result<Self> {
        read_env().map(Self::from_config)
    }

    /// Set grid width and height.
    pub fn grid(mut self, nx: usize, ny: usize) -> Self {
        self.config.nx = nx;
        self.config.ny = ny;
        self
    }

    /// Set the grid width.
    pub fn width(mut self, nx: usize) -> Self {
        self.config.nx = nx;
        self
    }

    /// Set the grid height.
    pub fn height(mut self, ny: usize) -> Self {
        self.config.ny = ny;
        self
    }

    /// Set the generation count.
    pub fn steps(mut self, steps: u64) -> Self {
        self.config.steps = steps;
        self
    }

    /// Set the initial pattern.
    pub fn pattern(mut self, pattern: PatternKind) -> Self {
        self.config.pattern = pattern;
        self
    }

    /// Set the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the snapshot interval.
    pub fn save_interval(mut self, interval: u64) -> Self {
        self.config.save_interval = interval;
        self
    }

    /// Set the snapshot directory.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Enable the benchmark line.
    pub fn benchmark(mut self, enabled: bool) -> Self {
        self.config.benchmark = enabled;
        self
    }

    /// Set the worker count.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set how initial rows are distributed.
    pub fn init_mode(mut self, mode: InitMode) -> Self {
        self.config.init_mode = mode;
        self
    }

    /// Set per-worker queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<RunConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!((config.nx, config.ny), (16384, 16384));
        assert_eq!(config.steps, 2000);
        assert_eq!(config.pattern, PatternKind::GliderGun);
        assert_eq!(config.seed, 42);
        assert_eq!(config.save_interval, 100);
        assert_eq!(config.output_dir, PathBuf::from("snapshots"));
        assert_eq!(config.workers, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_validates() {
        let config = RunConfigBuilder::new()
            .grid(64, 32)
            .steps(5)
            .workers(4)
            .pattern(PatternKind::Random)
            .seed(7)
            .build()
            .unwrap();
        assert_eq!(config.resolved_pattern(), Pattern::Random(7));

        let err = RunConfigBuilder::new().grid(8, 4).workers(5).build().unwrap_err();
        assert!(matches!(err, RingLifeError::TooManyWorkers { workers: 5, rows: 4 }));

        assert!(RunConfigBuilder::new().grid(0, 4).build().is_err());
        assert!(RunConfigBuilder::new().grid(4, 4).workers(0).build().is_err());
        assert!(RunConfigBuilder::new().queue_capacity(2).build().is_err());
    }

    #[test]
    fn test_snapshot_schedule() {
        let config = RunConfigBuilder::new()
            .steps(250)
            .save_interval(100)
            .build()
            .unwrap();
        let steps: Vec<_> = (0..=250).filter(|&g| config.is_snapshot_step(g)).collect();
        assert_eq!(steps, vec![0, 100, 200, 250]);

        let final_only = RunConfigBuilder::new()
            .steps(30)
            .save_interval(0)
            .build()
            .unwrap();
        let steps: Vec<_> = (0..=30).filter(|&g| final_only.is_snapshot_step(g)).collect();
        assert_eq!(steps, vec![30]);
    }

    #[test]
    fn test_load_from_str() {
        let toml = r#"
            nx = 256
            ny = 128
            steps = 50
            pattern = "r-pentomino"
            init_mode = "scatter"
            workers = 4
        "#;

        let config = load_config_from_str(toml).unwrap();
        assert_eq!((config.nx, config.ny), (256, 128));
        assert_eq!(config.steps, 50);
        assert_eq!(config.pattern, PatternKind::RPentomino);
        assert_eq!(config.init_mode, InitMode::Scatter);
        assert_eq!(config.workers, 4);
        // Unset keys keep their defaults
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_load_rejects_unknown_pattern() {
        let err = load_config_from_str("pattern = \"blinker\"").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_builder_from_file_defers_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "ny = 8\nworkers = 16").unwrap();

        let config = RunConfigBuilder::from_file(file.path())
            .unwrap()
            .height(64)
            .build()
            .unwrap();
        assert_eq!((config.ny, config.workers), (64, 16));

        assert!(RunConfigBuilder::from_file(file.path())
            .unwrap()
            .build()
            .is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "ny = 8\nworkers = 16").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, RingLifeError::TooManyWorkers { .. }));
    }
}
