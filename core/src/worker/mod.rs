//! Worker module for driving work units
//!
//! A runner is the per-spec execution unit, responsible for the simple but
//! critical loop: **perform -> gate -> repeat**.
//!
//! Each runner is a tokio task that:
//!
//! 1. Checks its termination condition (a one-shot cancel signal for
//!    duration-bound runs, a remaining operation budget otherwise)
//! 2. Calls `perform` on its work unit, which may send one stats record
//! 3. Lets its [`OperationGater`] sleep out the rest of a full rate window
//! 4. Repeats, then stops the unit exactly once on the way out
//!
//! Operation-bound runners never observe a cancel signal. Their run ends
//! only when the budget is exhausted.
//!
//! # Example
//!
//! ```ignore
//! use loadgen_core::worker::WorkerBuilder;
//!
//! let runner = WorkerBuilder::new(0)
//!     .spec(WorkSpec::new(Box::new(work)).with_max_ops(100))
//!     .stats_tx(tx)
//!     .build()?;
//!
//! let stats = runner.run().await?;
//! println!("Operations: {}", stats.operations);
//! ```

mod builder;
mod executor;
mod gater;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::WorkerRunner;
pub use gater::OperationGater;
pub use stats::WorkerStats;

#[cfg(test)]
mod tests;
