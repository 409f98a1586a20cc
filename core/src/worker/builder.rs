//! Builder pattern for WorkerRunner construction

use tokio::sync::oneshot;

use crate::channel::StatsSender;
use crate::config::WorkSpec;
use crate::error::{HarnessError, HarnessResult};
use crate::stats::{Stats, StatsRecord};

use super::executor::WorkerRunner;

/// Builder for creating WorkerRunner instances
///
/// A runner given a cancel signal is duration-bound; one without is
/// operation-bound.
///
/// # Example
/// ```ignore
/// let (cancel_tx, cancel_rx) = oneshot::channel();
/// let runner = WorkerBuilder::<Stats>::new(0)
///     .spec(spec)
///     .stats_tx(tx)
///     .cancel(cancel_rx)
///     .build()?;
/// ```
pub struct WorkerBuilder<R: StatsRecord = Stats> {
    id: usize,
    spec: Option<WorkSpec<R>>,
    stats_tx: Option<StatsSender<R>>,
    cancel: Option<oneshot::Receiver<()>>,
}

impl<R: StatsRecord> WorkerBuilder<R> {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            spec: None,
            stats_tx: None,
            cancel: None,
        }
    }

    /// Set the work spec
    pub fn spec(mut self, spec: WorkSpec<R>) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Set the stats channel sender
    pub fn stats_tx(mut self, tx: StatsSender<R>) -> Self {
        self.stats_tx = Some(tx);
        self
    }

    /// Set the cancellation signal, making the runner duration-bound
    pub fn cancel(mut self, cancel: oneshot::Receiver<()>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the WorkerRunner
    ///
    /// # Errors
    /// Returns an error if the spec or stats sender is missing.
    ///
    /// # Panics
    /// Panics if the spec's `max_ops` contradicts the chosen mode; see
    /// [`WorkerRunner::duration_bound`] and [`WorkerRunner::operation_bound`].
    pub fn build(self) -> HarnessResult<WorkerRunner<R>> {
        let spec = self.spec.ok_or(HarnessError::missing_config("spec"))?;
        let stats_tx = self
            .stats_tx
            .ok_or(HarnessError::missing_config("stats_tx"))?;

        Ok(match self.cancel {
            Some(cancel) => WorkerRunner::duration_bound(self.id, spec, stats_tx, cancel),
            None => WorkerRunner::operation_bound(self.id, spec, stats_tx),
        })
    }
}
