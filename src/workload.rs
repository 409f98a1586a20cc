//! Synthetic workload and run file
//!
//! Lets the harness be driven end to end without a system under test: each
//! operation optionally sleeps for a fixed latency and then reports one
//! success or, with probability `error_rate`, one error.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use loadgen_core::{HarnessConfig, Stats, StatsSender, WorkSpec, WorkUnit};

/// Which counter a synthetic operation bumps on success
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    Insert,
    Update,
    Delete,
    Query,
    #[default]
    Operation,
}

impl WorkloadKind {
    fn success(self) -> Stats {
        match self {
            Self::Insert => Stats::inserts(1),
            Self::Update => Stats::updates(1),
            Self::Delete => Stats::deletes(1),
            Self::Query => Stats::queries(1),
            Self::Operation => Stats::operations(1),
        }
    }
}

/// One workload entry of a run file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub name: String,
    pub kind: WorkloadKind,
    /// Number of specs (and so workers) created for this entry
    pub workers: usize,
    pub ops_per_interval: u64,
    pub interval_secs: u64,
    /// Per-worker budget; must be 0 for duration-bound runs
    pub max_ops: u64,
    pub latency_ms: u64,
    pub error_rate: f64,
    /// Base seed; worker `i` uses `seed + i`
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            kind: WorkloadKind::default(),
            workers: 1,
            ops_per_interval: 0,
            interval_secs: 0,
            max_ops: 0,
            latency_ms: 0,
            error_rate: 0.0,
            seed: None,
        }
    }
}

impl WorkloadConfig {
    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workload '{}': workers must be at least 1", self.name);
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            bail!(
                "workload '{}': error_rate must be within [0, 1], got {}",
                self.name,
                self.error_rate
            );
        }
        Ok(())
    }

    fn specs(&self) -> impl Iterator<Item = WorkSpec> + '_ {
        (0..self.workers).map(move |i| {
            let rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                None => StdRng::from_os_rng(),
            };
            let work = SyntheticWork {
                name: format!("{}-{}", self.name, i),
                kind: self.kind,
                latency: Duration::from_millis(self.latency_ms),
                error_rate: self.error_rate,
                rng,
                performed: 0,
            };
            WorkSpec::new(Box::new(work))
                .with_max_ops(self.max_ops)
                .with_rate_limit(self.ops_per_interval, self.interval_secs)
        })
    }
}

/// Top-level run file: harness settings plus workloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFile {
    pub harness: HarnessConfig,
    pub workloads: Vec<WorkloadConfig>,
}

impl RunFile {
    /// Read and parse a JSON run file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid run file {}", path.display()))
    }

    /// Parse a JSON run file and check each workload entry
    pub fn parse(raw: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(raw).context("Failed to parse JSON")?;
        file.harness.validate()?;
        for workload in &file.workloads {
            workload.validate()?;
        }
        Ok(file)
    }

    /// One spec per worker of every workload, in file order
    pub fn specs(&self) -> Vec<WorkSpec> {
        self.workloads.iter().flat_map(|w| w.specs()).collect()
    }
}

/// Work unit that simulates an operation of fixed latency
pub struct SyntheticWork {
    name: String,
    kind: WorkloadKind,
    latency: Duration,
    error_rate: f64,
    rng: StdRng,
    performed: u64,
}

#[async_trait]
impl WorkUnit for SyntheticWork {
    async fn perform(&mut self, stats: &StatsSender) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.performed += 1;

        let record = if self.error_rate > 0.0 && self.rng.random_bool(self.error_rate) {
            Stats::errors(1)
        } else {
            self.kind.success()
        };
        stats.send(record).await;
    }

    async fn stop(self: Box<Self>) {
        tracing::debug!(workload = %self.name, performed = self.performed, "Synthetic workload stopped");
    }

    fn name(&self) -> &str {
        &self.name
    }
}
