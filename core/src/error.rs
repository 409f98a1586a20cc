//! Error types for loadgen-core

use std::time::Duration;

use thiserror::Error;

/// Core error type
///
/// Only configuration and task-level failures surface here. Failures of an
/// individual operation are counted by the workload in its stats record and
/// never become a `HarnessError`.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Self-contradictory or out-of-range configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A work spec disagrees with the run mode implied by the duration
    #[error(
        "work spec {index} has max_ops = {max_ops}, which is invalid for a run duration of {duration:?}"
    )]
    RunModeMismatch {
        /// Position of the offending spec
        index: usize,
        /// The spec's operation budget
        max_ops: u64,
        /// The overall run duration
        duration: Duration,
    },

    /// A required builder field was not provided
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// A worker task panicked or was lost
    #[error("worker {worker_id} failed: {message}")]
    Worker {
        /// Index of the failed worker
        worker_id: usize,
        /// Panic payload or join error
        message: String,
    },

    /// Run-level failure after workers were started
    #[error("orchestration error: {0}")]
    Orchestration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a missing configuration error
    pub fn missing_config(field: &'static str) -> Self {
        Self::MissingConfig(field)
    }

    /// Create a worker failure
    pub fn worker(worker_id: usize, message: impl Into<String>) -> Self {
        Self::Worker {
            worker_id,
            message: message.into(),
        }
    }

    /// Create an orchestration error
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::Orchestration(message.into())
    }

    /// Whether this error was raised before any task started
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::RunModeMismatch { .. } | Self::MissingConfig(_)
        )
    }
}

/// Result type alias
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
