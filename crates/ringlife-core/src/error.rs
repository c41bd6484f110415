//! Error types for RingLife.
//!
//! Every error is fatal to the whole distributed run. Errors raised inside a
//! worker carry the worker identity and the phase it was in, so the launcher
//! can report where the run broke.

use std::fmt;

use thiserror::Error;

use crate::message::WorkerId;

/// Result type alias using [`RingLifeError`].
pub type Result<T> = std::result::Result<T, RingLifeError>;

/// Phase of a run in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Planning, pattern generation and initial distribution.
    Init,
    /// Halo exchange between ring neighbors.
    Exchange,
    /// Local step kernel.
    Kernel,
    /// Global checksum reduction.
    Reduce,
    /// Gathering the grid to the coordinator.
    Gather,
    /// Writing a snapshot artifact.
    Snapshot,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Exchange => "exchange",
            Phase::Kernel => "kernel",
            Phase::Reduce => "reduce",
            Phase::Gather => "gather",
            Phase::Snapshot => "snapshot",
        };
        f.write_str(name)
    }
}

/// RingLife error type.
#[derive(Error, Debug)]
pub enum RingLifeError {
    /// Invalid run configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pattern name outside the supported set.
    #[error("Unknown pattern '{0}' (expected one of: glider, glider_gun, r_pentomino, random)")]
    UnknownPattern(String),

    /// More workers than grid rows; zero-row partitions are not allowed.
    #[error("Worker count {workers} exceeds grid height {rows}")]
    TooManyWorkers {
        /// Requested worker count.
        workers: usize,
        /// Grid height in rows.
        rows: usize,
    },

    /// A post, send, receive or wait failed.
    #[error("Communication failure on worker {worker} during {phase}: {message}")]
    Communication {
        /// Worker that observed the failure.
        worker: WorkerId,
        /// Phase in which it happened.
        phase: Phase,
        /// Description of the failure.
        message: String,
    },

    /// A worker failed for a reason other than communication.
    #[error("Worker {worker} failed during {phase}: {message}")]
    WorkerFailed {
        /// Worker that failed.
        worker: WorkerId,
        /// Phase in which it failed.
        phase: Phase,
        /// Description of the failure.
        message: String,
    },

    /// Malformed or unwritable snapshot artifact.
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RingLifeError {
    /// Build a communication error.
    pub fn communication(worker: WorkerId, phase: Phase, message: impl Into<String>) -> Self {
        RingLifeError::Communication {
            worker,
            phase,
            message: message.into(),
        }
    }

    /// Re-tag an error with the worker and phase in which it surfaced.
    ///
    /// Communication and worker errors keep their message but take the new
    /// phase; configuration errors pass through untouched.
    pub fn with_context(self, worker: WorkerId, phase: Phase) -> Self {
        match self {
            RingLifeError::Communication { message, .. } => RingLifeError::Communication {
                worker,
                phase,
                message,
            },
            RingLifeError::WorkerFailed { message, .. } => RingLifeError::WorkerFailed {
                worker,
                phase,
                message,
            },
            RingLifeError::Io(e) => RingLifeError::WorkerFailed {
                worker,
                phase,
                message: e.to_string(),
            },
            other => other,
        }
    }

    /// Whether this is a configuration error detected before the first generation.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RingLifeError::InvalidConfig(_)
                | RingLifeError::UnknownPattern(_)
                | RingLifeError::TooManyWorkers { .. }
        )
    }
}
