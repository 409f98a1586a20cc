//! CLI argument parsing and command dispatch

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use loadgen_core::{CounterSink, Orchestrator, OrchestratorBuilder, RunMode};

use crate::workload::RunFile;

#[derive(Parser)]
#[command(name = "loadgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the workloads of a run file
    Run {
        /// Path to the JSON run file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Check a run file without starting any worker
    Validate {
        /// Path to the JSON run file
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run { config } => run(&config).await,
            Commands::Validate { config } => validate(&config),
        }
    }
}

fn build(path: &Path) -> Result<Orchestrator<CounterSink>> {
    let file = RunFile::load(path)?;
    OrchestratorBuilder::new(CounterSink::stdout())
        .config(&file.harness)
        .works(file.specs())
        .build()
        .with_context(|| format!("Invalid harness setup in {}", path.display()))
}

async fn run(path: &Path) -> Result<()> {
    let orchestrator = build(path)?;
    let summary = orchestrator
        .run_with_signal_handling()
        .await
        .context("Run failed")?;

    if summary.failed_workers > 0 {
        tracing::warn!(
            failed_workers = summary.failed_workers,
            "Some workers failed; totals cover the rest"
        );
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let orchestrator = build(path)?;
    let mode = match orchestrator.mode() {
        RunMode::DurationBound(duration) => format!("duration-bound ({}s)", duration.as_secs()),
        RunMode::OperationBound => "operation-bound".to_string(),
    };
    println!(
        "{}: OK, {} workers, {}",
        path.display(),
        orchestrator.worker_count(),
        mode
    );
    Ok(())
}
