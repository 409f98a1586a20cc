//! Worker statistics tracking

use std::time::Duration;

use tokio::time::Instant;

/// Statistics tracked by each runner
///
/// These count what the runner drove, independent of the records the work
/// unit chose to send.
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Worker index within the run
    pub worker_id: usize,

    /// Number of `perform` calls that returned
    pub operations: u64,

    /// Number of times the gater opened a new window
    pub windows: u64,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Record one completed operation
    pub fn record_operation(&mut self) {
        self.operations += 1;
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Get operations per second
    pub fn ops_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.operations as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Merge stats from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.operations += other.operations;
        self.windows += other.windows;
    }
}
