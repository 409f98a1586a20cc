//! Orchestrator execution logic

use std::fmt;
use std::future::{pending, Future};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;

use crate::channel::{stats_channel, ChannelConfig};
use crate::config::{RunMode, WorkSpec};
use crate::error::{HarnessError, HarnessResult};
use crate::traits::ResultSink;
use crate::worker::{WorkerBuilder, WorkerRunner, WorkerStats};

use super::aggregator::ResultAggregator;
use super::reporter::Reporter;

/// Lifecycle of a run, in the order phases are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Configuration collected
    Init,
    /// Run-mode invariant checked across every spec
    Validated,
    /// Workers, aggregator and reporter spawned
    Running,
    /// Cancelling duration-bound workers and joining all of them
    DrainWorkers,
    /// Stopping the aggregator once no producer remains
    DrainAggregator,
    /// Stopping the reporter, which prints the final summary
    DrainReporter,
    /// Every task has stopped
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Validated => "validated",
            Self::Running => "running",
            Self::DrainWorkers => "drain_workers",
            Self::DrainAggregator => "drain_aggregator",
            Self::DrainReporter => "drain_reporter",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run
#[derive(Debug)]
pub struct RunSummary<S> {
    /// The sink, after its final summary was printed
    pub sink: S,

    /// How the run terminated
    pub mode: RunMode,

    /// Stats of every worker that finished cleanly, by worker index
    pub workers: Vec<WorkerStats>,

    /// Workers that panicked or were lost
    pub failed_workers: usize,

    /// Records merged by the aggregator
    pub records_merged: u64,

    /// Periodic reports printed
    pub reports_printed: u64,

    /// Wall time from start to the final report
    pub elapsed: Duration,

    /// Phases entered, in order
    pub phases: Vec<RunPhase>,
}

impl<S> RunSummary<S> {
    /// Operations performed across all clean workers
    pub fn total_operations(&self) -> u64 {
        self.workers.iter().map(|w| w.operations).sum()
    }
}

/// Orchestrator manages the run lifecycle
///
/// Spawns one runner per spec plus the aggregator and reporter, then shuts
/// them down strictly in order: workers, aggregator, reporter. That order is
/// what keeps in-flight records from being lost and makes the final report
/// complete.
pub struct Orchestrator<S: ResultSink> {
    /// Run mode derived and validated from the duration
    pub(crate) mode: RunMode,

    /// One runner is spawned per spec
    pub(crate) specs: Vec<WorkSpec<S::Record>>,

    /// Sink handed to the aggregator and reporter
    pub(crate) sink: S,

    /// Reporter tick
    pub(crate) report_interval: Duration,

    /// Stats channel settings
    pub(crate) channel_config: ChannelConfig,
}

impl<S: ResultSink> Orchestrator<S> {
    /// Get the validated run mode
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Number of workers this run will spawn
    pub fn worker_count(&self) -> usize {
        self.specs.len()
    }

    /// Run to completion
    pub async fn run(self) -> HarnessResult<RunSummary<S>> {
        self.run_until(pending::<()>()).await
    }

    /// Run with Ctrl+C signal handling
    ///
    /// Ctrl+C cuts a duration-bound run short. Operation-bound workers
    /// still finish their budgets.
    pub async fn run_with_signal_handling(self) -> HarnessResult<RunSummary<S>> {
        self.run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received Ctrl+C, initiating graceful shutdown..."),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                    pending::<()>().await;
                }
            }
        })
        .await
    }

    /// Run, ending the duration sleep early if `shutdown` resolves first
    ///
    /// `shutdown` is only observed while a duration-bound run sleeps; it is
    /// ignored by operation-bound runs.
    pub async fn run_until<F>(self, shutdown: F) -> HarnessResult<RunSummary<S>>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let Self {
            mode,
            specs,
            sink,
            report_interval,
            channel_config,
        } = self;
        let mut phases = vec![RunPhase::Init, RunPhase::Validated];
        let worker_count = specs.len();

        let (stats_tx, stats_rx) = stats_channel(&channel_config);

        // build every runner before spawning anything
        let mut worker_cancels = Vec::new();
        let runners = specs
            .into_iter()
            .enumerate()
            .map(|(id, spec)| {
                let mut builder = WorkerBuilder::new(id).spec(spec).stats_tx(stats_tx.clone());
                if let RunMode::DurationBound(_) = mode {
                    let (cancel_tx, cancel_rx) = oneshot::channel();
                    worker_cancels.push(cancel_tx);
                    builder = builder.cancel(cancel_rx);
                }
                builder.build()
            })
            .collect::<HarnessResult<Vec<WorkerRunner<S::Record>>>>()?;
        drop(stats_tx);

        enter(&mut phases, RunPhase::Running);
        tracing::info!(
            workers = worker_count,
            mode = ?mode,
            report_interval_ms = report_interval.as_millis() as u64,
            stats_buffer = channel_config.stats_buffer,
            "Starting run"
        );

        let handles: Vec<_> = runners
            .into_iter()
            .map(|runner| tokio::spawn(runner.run()))
            .collect();

        let sink = Arc::new(Mutex::new(sink));

        let (aggregator_cancel, cancel_rx) = oneshot::channel();
        let aggregator =
            tokio::spawn(ResultAggregator::new(Arc::clone(&sink), stats_rx, cancel_rx).run());

        let (reporter_cancel, cancel_rx) = oneshot::channel();
        let reporter =
            tokio::spawn(Reporter::new(Arc::clone(&sink), report_interval, cancel_rx).run());

        if let RunMode::DurationBound(duration) = mode {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    tracing::info!(duration_secs = duration.as_secs_f64(), "Run duration elapsed");
                }
                _ = shutdown => {
                    tracing::info!(
                        elapsed_secs = start.elapsed().as_secs_f64(),
                        "Shutdown requested before run duration elapsed"
                    );
                }
            }
        }

        enter(&mut phases, RunPhase::DrainWorkers);
        for cancel in worker_cancels {
            // a worker that already failed has dropped its receiver
            let _ = cancel.send(());
        }

        let mut workers = Vec::with_capacity(worker_count);
        let mut failed_workers = 0;
        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(stats)) => {
                    tracing::debug!(
                        worker_id = idx,
                        operations = stats.operations,
                        "Worker completed"
                    );
                    workers.push(stats);
                }
                Ok(Err(e)) => {
                    failed_workers += 1;
                    tracing::error!(worker_id = idx, error = %e, "Worker returned error");
                }
                Err(e) => {
                    failed_workers += 1;
                    tracing::error!(worker_id = idx, error = %e, "Worker task panicked");
                }
            }
        }

        enter(&mut phases, RunPhase::DrainAggregator);
        let _ = aggregator_cancel.send(());
        let aggregated = aggregator.await;

        enter(&mut phases, RunPhase::DrainReporter);
        let _ = reporter_cancel.send(());
        let reported = reporter.await;

        let records_merged = aggregated
            .map_err(|e| HarnessError::orchestration(format!("aggregator task failed: {e}")))?;
        let reports_printed = reported
            .map_err(|e| HarnessError::orchestration(format!("reporter task failed: {e}")))?;

        let sink = Arc::try_unwrap(sink)
            .map_err(|_| HarnessError::orchestration("sink still shared after shutdown"))?
            .into_inner();

        enter(&mut phases, RunPhase::Done);

        if worker_count > 0 && failed_workers == worker_count {
            return Err(HarnessError::orchestration(format!(
                "All {} workers failed to complete",
                failed_workers
            )));
        }

        let summary = RunSummary {
            sink,
            mode,
            workers,
            failed_workers,
            records_merged,
            reports_printed,
            elapsed: start.elapsed(),
            phases,
        };

        tracing::info!(
            elapsed_secs = summary.elapsed.as_secs_f64(),
            operations = summary.total_operations(),
            records_merged = summary.records_merged,
            failed_workers = summary.failed_workers,
            "Run completed"
        );

        Ok(summary)
    }
}

fn enter(phases: &mut Vec<RunPhase>, phase: RunPhase) {
    tracing::info!(phase = %phase, "Entering phase");
    phases.push(phase);
}

impl<S: ResultSink> fmt::Debug for Orchestrator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("mode", &self.mode)
            .field("specs", &self.specs)
            .field("report_interval", &self.report_interval)
            .field("channel_config", &self.channel_config)
            .finish()
    }
}
