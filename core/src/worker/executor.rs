//! Worker execution loop

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::channel::StatsSender;
use crate::config::{RateLimit, WorkSpec};
use crate::error::{HarnessError, HarnessResult};
use crate::stats::{Stats, StatsRecord};
use crate::traits::WorkUnit;

use super::gater::OperationGater;
use super::stats::WorkerStats;

/// How a runner's loop ends
enum Termination {
    /// Poll a one-shot signal before every operation
    Cancel(oneshot::Receiver<()>),
    /// Perform exactly this many operations; never cancelled
    MaxOps(u64),
}

/// Drives one work unit: perform -> gate -> repeat
///
/// The runner exclusively owns its unit and its gater. On every exit path,
/// including a panic inside `perform`, the unit is stopped exactly once
/// before `run` returns.
pub struct WorkerRunner<R: StatsRecord = Stats> {
    /// Worker index within the run
    id: usize,

    /// The unit being driven
    work: Box<dyn WorkUnit<R>>,

    /// Per-worker throttle
    gater: OperationGater,

    /// Producer half of the stats channel
    stats_tx: StatsSender<R>,

    /// Loop exit condition
    termination: Termination,
}

impl<R: StatsRecord> WorkerRunner<R> {
    /// Create a runner that loops until `cancel` fires
    ///
    /// # Panics
    /// Panics if `spec.max_ops > 0`. Run-mode consistency is validated before
    /// any runner is built, so reaching this is a programming error.
    pub fn duration_bound(
        id: usize,
        spec: WorkSpec<R>,
        stats_tx: StatsSender<R>,
        cancel: oneshot::Receiver<()>,
    ) -> Self {
        assert!(
            spec.max_ops == 0,
            "duration-bound worker {id} constructed with max_ops = {}; it must be 0",
            spec.max_ops
        );
        Self::with_termination(id, spec, stats_tx, Termination::Cancel(cancel))
    }

    /// Create a runner that performs exactly `spec.max_ops` operations
    ///
    /// # Panics
    /// Panics if `spec.max_ops == 0`.
    pub fn operation_bound(id: usize, spec: WorkSpec<R>, stats_tx: StatsSender<R>) -> Self {
        assert!(
            spec.max_ops > 0,
            "operation-bound worker {id} constructed with max_ops = 0; it must be > 0"
        );
        let max_ops = spec.max_ops;
        Self::with_termination(id, spec, stats_tx, Termination::MaxOps(max_ops))
    }

    fn with_termination(
        id: usize,
        spec: WorkSpec<R>,
        stats_tx: StatsSender<R>,
        termination: Termination,
    ) -> Self {
        Self {
            id,
            gater: OperationGater::new(spec.rate_limit),
            work: spec.work,
            stats_tx,
            termination,
        }
    }

    /// Run the worker loop
    ///
    /// Returns `WorkerStats` once the loop ends, or `HarnessError::Worker` if
    /// the unit panicked. The unit has been stopped in both cases.
    pub async fn run(self) -> HarnessResult<WorkerStats> {
        let Self {
            id,
            mut work,
            mut gater,
            stats_tx,
            termination,
        } = self;

        let mut stats = WorkerStats::new(id);
        stats.start();

        tracing::debug!(
            worker_id = id,
            work = work.name(),
            rate_limit = ?gater.limit(),
            "Worker started"
        );

        let outcome = AssertUnwindSafe(drive(
            &mut work,
            &mut gater,
            &stats_tx,
            termination,
            &mut stats,
        ))
        .catch_unwind()
        .await;

        work.stop().await;
        drop(stats_tx);
        stats.stop();

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    worker_id = id,
                    operations = stats.operations,
                    elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
                    "Worker finished"
                );
                Ok(stats)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    worker_id = id,
                    operations = stats.operations,
                    error = %message,
                    "Worker panicked"
                );
                Err(HarnessError::worker(id, message))
            }
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Check if this runner ends after a fixed number of operations
    pub fn is_operation_bound(&self) -> bool {
        matches!(self.termination, Termination::MaxOps(_))
    }

    /// The rate limit applied between operations
    pub fn rate_limit(&self) -> RateLimit {
        self.gater.limit()
    }
}

async fn drive<R: StatsRecord>(
    work: &mut Box<dyn WorkUnit<R>>,
    gater: &mut OperationGater,
    stats_tx: &StatsSender<R>,
    termination: Termination,
    stats: &mut WorkerStats,
) {
    match termination {
        Termination::Cancel(mut cancel) => loop {
            match cancel.try_recv() {
                Err(TryRecvError::Empty) => {}
                // signalled, or the orchestrator dropped the sender
                Ok(()) | Err(TryRecvError::Closed) => break,
            }
            step(work, gater, stats_tx, stats).await;
        },
        Termination::MaxOps(max_ops) => {
            for _ in 0..max_ops {
                step(work, gater, stats_tx, stats).await;
            }
        }
    }
}

async fn step<R: StatsRecord>(
    work: &mut Box<dyn WorkUnit<R>>,
    gater: &mut OperationGater,
    stats_tx: &StatsSender<R>,
    stats: &mut WorkerStats,
) {
    work.perform(stats_tx).await;
    stats.record_operation();
    if gater.gate().await {
        stats.windows += 1;
    }
    // a unit that never awaits would otherwise starve timers on a
    // current-thread runtime
    tokio::task::yield_now().await;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

impl<R: StatsRecord> std::fmt::Debug for WorkerRunner<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRunner")
            .field("id", &self.id)
            .field("work", &self.work.name())
            .field("gater", &self.gater)
            .field("operation_bound", &self.is_operation_bound())
            .finish()
    }
}
