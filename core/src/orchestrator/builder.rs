//! Builder pattern for Orchestrator construction

use std::time::Duration;

use crate::channel::ChannelConfig;
use crate::config::{validate_work_specs, HarnessConfig, WorkSpec, DEFAULT_REPORT_INTERVAL};
use crate::error::{HarnessError, HarnessResult};
use crate::traits::ResultSink;

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new(CounterSink::stdout())
///     .duration(Duration::from_secs(30))
///     .work(WorkSpec::new(Box::new(inserter)).with_rate_limit(500, 1))
///     .work(WorkSpec::new(Box::new(reader)))
///     .build()?;
///
/// let summary = orchestrator.run_with_signal_handling().await?;
/// ```
pub struct OrchestratorBuilder<S: ResultSink> {
    sink: S,
    specs: Vec<WorkSpec<S::Record>>,
    duration: Duration,
    report_interval: Duration,
    channel_config: ChannelConfig,
}

impl<S: ResultSink> OrchestratorBuilder<S> {
    /// Create a builder reporting into `sink`, operation-bound by default
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            specs: Vec::new(),
            duration: Duration::ZERO,
            report_interval: DEFAULT_REPORT_INTERVAL,
            channel_config: ChannelConfig::default(),
        }
    }

    /// Apply duration, report interval and buffer size from a config
    pub fn config(mut self, config: &HarnessConfig) -> Self {
        self.duration = config.duration();
        self.report_interval = config.report_interval();
        self.channel_config = config.channel();
        self
    }

    /// Set the overall duration; zero makes the run operation-bound
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the interval between periodic reports
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Add one work spec; one worker is spawned per spec
    pub fn work(mut self, spec: WorkSpec<S::Record>) -> Self {
        self.specs.push(spec);
        self
    }

    /// Add several work specs
    pub fn works(mut self, specs: impl IntoIterator<Item = WorkSpec<S::Record>>) -> Self {
        self.specs.extend(specs);
        self
    }

    /// Validate and build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the report interval is zero, the stats buffer is
    /// zero, or any spec disagrees with the run mode implied by the duration.
    /// Nothing has been spawned when this fails.
    pub fn build(self) -> HarnessResult<Orchestrator<S>> {
        if self.report_interval.is_zero() {
            return Err(HarnessError::config("report interval must be positive"));
        }
        self.channel_config.validate()?;

        let mode = validate_work_specs(&self.specs, self.duration)?;

        tracing::debug!(
            workers = self.specs.len(),
            mode = ?mode,
            "Orchestrator configuration validated"
        );

        Ok(Orchestrator {
            mode,
            specs: self.specs,
            sink: self.sink,
            report_interval: self.report_interval,
            channel_config: self.channel_config,
        })
    }
}
