//! Run configuration types
//!
//! Everything a run needs is carried here and handed to the orchestrator by
//! value; there is no process-wide mutable state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelConfig, DEFAULT_STATS_BUFFER};
use crate::error::{HarnessError, HarnessResult};
use crate::stats::{Stats, StatsRecord};
use crate::traits::WorkUnit;

/// Default interval between periodic reports
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// Rate limit
// ============================================================================

/// Per-worker throughput cap: at most `ops_per_interval` per `interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimit {
    /// Maximum operations per window; 0 disables gating
    pub ops_per_interval: u64,
    /// Window length; zero disables gating
    pub interval: Duration,
}

impl RateLimit {
    /// Create a rate limit from an operation count and window in seconds
    pub fn new(ops_per_interval: u64, interval_secs: u64) -> Self {
        Self {
            ops_per_interval,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// No gating
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Check if gating applies
    pub fn is_enabled(&self) -> bool {
        self.ops_per_interval > 0 && !self.interval.is_zero()
    }
}

// ============================================================================
// Work spec
// ============================================================================

/// A work unit paired with its rate limit and termination budget
///
/// `max_ops == 0` means duration-bound; `max_ops > 0` means the runner stops
/// after exactly that many operations.
pub struct WorkSpec<R: StatsRecord = Stats> {
    /// The unit driven by this spec's runner
    pub work: Box<dyn WorkUnit<R>>,
    /// Gating applied after every operation
    pub rate_limit: RateLimit,
    /// Operation budget; 0 for duration-bound
    pub max_ops: u64,
}

impl<R: StatsRecord> WorkSpec<R> {
    /// Duration-bound spec with no rate limit
    pub fn new(work: Box<dyn WorkUnit<R>>) -> Self {
        Self {
            work,
            rate_limit: RateLimit::unlimited(),
            max_ops: 0,
        }
    }

    /// Set the operation budget
    pub fn with_max_ops(mut self, max_ops: u64) -> Self {
        self.max_ops = max_ops;
        self
    }

    /// Limit to `ops_per_interval` operations every `interval_secs` seconds
    pub fn with_rate_limit(mut self, ops_per_interval: u64, interval_secs: u64) -> Self {
        self.rate_limit = RateLimit::new(ops_per_interval, interval_secs);
        self
    }

    /// Check if this spec ends after a fixed number of operations
    pub fn is_operation_bound(&self) -> bool {
        self.max_ops > 0
    }
}

impl<R: StatsRecord> fmt::Debug for WorkSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkSpec")
            .field("work", &self.work.name())
            .field("rate_limit", &self.rate_limit)
            .field("max_ops", &self.max_ops)
            .finish()
    }
}

// ============================================================================
// Run mode
// ============================================================================

/// How a run terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Workers run until cancelled after the given duration
    DurationBound(Duration),
    /// Workers run their fixed operation budgets; no deadline
    OperationBound,
}

impl RunMode {
    /// Derive the mode from the overall duration; zero means operation-bound
    pub fn from_duration(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::OperationBound
        } else {
            Self::DurationBound(duration)
        }
    }
}

/// Check that every spec agrees with the run mode implied by `duration`
///
/// A positive duration requires every spec to have `max_ops == 0`; a zero
/// duration requires every spec to have `max_ops > 0`.
pub fn validate_work_specs<R: StatsRecord>(
    specs: &[WorkSpec<R>],
    duration: Duration,
) -> HarnessResult<RunMode> {
    let mode = RunMode::from_duration(duration);
    let expect_operation_bound = mode == RunMode::OperationBound;

    if let Some((index, spec)) = specs
        .iter()
        .enumerate()
        .find(|(_, spec)| spec.is_operation_bound() != expect_operation_bound)
    {
        return Err(HarnessError::RunModeMismatch {
            index,
            max_ops: spec.max_ops,
            duration,
        });
    }

    Ok(mode)
}

// ============================================================================
// Harness config
// ============================================================================

/// Serializable harness settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Overall run duration in seconds; 0 means operation-bound
    pub duration_secs: u64,

    /// Interval between periodic reports, in milliseconds
    pub report_interval_ms: u64,

    /// Stats channel capacity
    pub stats_buffer: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            duration_secs: 0,
            report_interval_ms: DEFAULT_REPORT_INTERVAL.as_millis() as u64,
            stats_buffer: DEFAULT_STATS_BUFFER,
        }
    }
}

impl HarnessConfig {
    /// Duration-bound config running for `secs` seconds
    pub fn for_duration(secs: u64) -> Self {
        Self {
            duration_secs: secs,
            ..Default::default()
        }
    }

    /// Set the report interval
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the stats channel capacity
    pub fn with_stats_buffer(mut self, size: usize) -> Self {
        self.stats_buffer = size;
        self
    }

    /// Overall run duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Report interval
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// Channel settings derived from this config
    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig::default().with_stats_buffer(self.stats_buffer)
    }

    /// Validate the configuration
    pub fn validate(&self) -> HarnessResult<()> {
        if self.report_interval_ms == 0 {
            return Err(HarnessError::config("report interval must be positive"));
        }
        self.channel().validate()
    }
}
