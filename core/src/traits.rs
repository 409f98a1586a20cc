//! Capability contracts at the harness boundary
//!
//! Workloads implement [`WorkUnit`]; result presentation implements
//! [`ResultSink`]. Both are defined here so workload crates depend only on
//! the core.

use async_trait::async_trait;

use crate::channel::StatsSender;
use crate::stats::{Stats, StatsRecord};

// ============================================================================
// Work Unit Trait
// ============================================================================

/// One workload's single operation plus cleanup
///
/// A unit is driven by exactly one runner. `perform` is called repeatedly
/// until the runner stops; `stop` is then called exactly once, which the
/// `self: Box<Self>` receiver enforces.
#[async_trait]
pub trait WorkUnit<R: StatsRecord = Stats>: Send {
    /// Execute one operation and send at most one record describing it
    ///
    /// Failures are counted in the record (e.g. [`Stats::errors`]), not
    /// returned. Must not block indefinitely.
    async fn perform(&mut self, stats: &StatsSender<R>);

    /// Release connections, generators and any other held resources
    async fn stop(self: Box<Self>);

    /// Short label used in log events
    fn name(&self) -> &str {
        "work"
    }
}

// ============================================================================
// Result Sink Trait
// ============================================================================

/// Cumulative aggregate of every record plus reporting state
///
/// The aggregator is the only caller of `merge_record`; the reporter is the
/// only caller of the print methods.
pub trait ResultSink: Send + 'static {
    /// Record type this sink consumes
    type Record: StatsRecord;

    /// Fold one record into the cumulative state
    fn merge_record(&mut self, record: Self::Record);

    /// Print a progress snapshot and reset the since-last-report delta
    fn print_periodic(&mut self);

    /// Print the run summary; called once, after every merge
    fn print_final(&mut self);
}
