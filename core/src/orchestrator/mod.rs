//! Orchestrator for run lifecycle management
//!
//! The Orchestrator coordinates a complete load run:
//! - Validating that every work spec agrees with the run mode
//! - Spawning one worker per spec, plus the aggregator and reporter
//! - Sleeping out the duration of a duration-bound run
//! - Shutting down in order: workers, then aggregator, then reporter
//!
//! # Example
//!
//! ```ignore
//! use loadgen_core::{CounterSink, OrchestratorBuilder, WorkSpec};
//!
//! let orchestrator = OrchestratorBuilder::new(CounterSink::stdout())
//!     .work(WorkSpec::new(Box::new(inserter)).with_max_ops(10_000))
//!     .build()?;
//!
//! let summary = orchestrator.run().await?;
//! ```

mod aggregator;
mod builder;
mod executor;
mod reporter;

pub use aggregator::ResultAggregator;
pub use builder::OrchestratorBuilder;
pub use executor::{Orchestrator, RunPhase, RunSummary};
pub use reporter::Reporter;
