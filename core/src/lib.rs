//! loadgen-core: a generic load-generation harness
//!
//! This crate drives user-supplied workloads against a system under test and
//! aggregates what they report:
//!
//! - [`WorkUnit`] and [`ResultSink`], the two seams a workload implements
//! - Workers that repeat one operation, optionally gated to N ops per interval
//! - A bounded stats channel fanning records in to a single aggregator
//! - A reporter printing periodic snapshots and a final summary
//! - An orchestrator enforcing the run-mode invariant and shutdown order
//!
//! # Example
//!
//! ```ignore
//! use loadgen_core::{CounterSink, HarnessConfig, OrchestratorBuilder, WorkSpec};
//!
//! let summary = OrchestratorBuilder::new(CounterSink::stdout())
//!     .config(&HarnessConfig::for_duration(60))
//!     .work(WorkSpec::new(Box::new(writer)).with_rate_limit(1_000, 1))
//!     .build()?
//!     .run_with_signal_handling()
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod sink;
pub mod stats;
pub mod traits;
pub mod worker;

pub use channel::{stats_channel, ChannelConfig, StatsReceiver, StatsSender};
pub use config::{validate_work_specs, HarnessConfig, RateLimit, RunMode, WorkSpec};
pub use error::*;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RunPhase, RunSummary};
pub use sink::{CounterSink, IntervalSnapshot, SharedSink};
pub use stats::{Stats, StatsRecord};
pub use traits::*;
pub use worker::{OperationGater, WorkerBuilder, WorkerRunner, WorkerStats};
