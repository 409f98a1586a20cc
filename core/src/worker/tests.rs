//! Integration tests for the Worker module

use super::*;
use crate::channel::{stats_channel, ChannelConfig, StatsReceiver, StatsSender};
use crate::config::WorkSpec;
use crate::error::HarnessError;
use crate::stats::{Stats, StatsRecord};
use crate::traits::WorkUnit;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

// ============================================================================
// Mock WorkUnit
// ============================================================================

#[derive(Clone, Default)]
struct Probe {
    performed: Arc<AtomicU64>,
    stopped: Arc<AtomicUsize>,
}

impl Probe {
    fn performed(&self) -> u64 {
        self.performed.load(Ordering::SeqCst)
    }

    fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

struct MockWork {
    probe: Probe,
    delay: Option<Duration>,
    fail_every: Option<u64>,
    panic_at: Option<u64>,
}

impl MockWork {
    fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
            delay: None,
            fail_every: None,
            panic_at: None,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n);
        self
    }

    fn with_panic_at(mut self, n: u64) -> Self {
        self.panic_at = Some(n);
        self
    }
}

#[async_trait]
impl WorkUnit for MockWork {
    async fn perform(&mut self, stats: &StatsSender) {
        let count = self.probe.performed.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.panic_at == Some(count) {
            panic!("simulated failure at op {count}");
        }

        let record = match self.fail_every {
            Some(n) if count % n == 0 => Stats::errors(1),
            _ => Stats::operations(1),
        };
        stats.send(record).await;
    }

    async fn stop(self: Box<Self>) {
        self.probe.stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn spawn_drain(mut rx: StatsReceiver) -> JoinHandle<Stats> {
    tokio::spawn(async move {
        let mut total = Stats::default();
        while let Some(record) = rx.recv().await {
            total.merge(record);
        }
        total
    })
}

fn operation_bound_runner(work: MockWork, max_ops: u64, limit: Option<(u64, u64)>) -> (WorkerRunner, StatsReceiver) {
    let (tx, rx) = stats_channel(&ChannelConfig::default());
    let mut spec = WorkSpec::new(Box::new(work) as Box<dyn WorkUnit>).with_max_ops(max_ops);
    if let Some((ops, secs)) = limit {
        spec = spec.with_rate_limit(ops, secs);
    }
    let runner = WorkerBuilder::new(0)
        .spec(spec)
        .stats_tx(tx)
        .build()
        .expect("Failed to build worker");
    (runner, rx)
}

fn duration_bound_runner(
    work: MockWork,
    limit: Option<(u64, u64)>,
) -> (WorkerRunner, StatsReceiver, oneshot::Sender<()>) {
    let (tx, rx) = stats_channel(&ChannelConfig::default());
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let mut spec = WorkSpec::new(Box::new(work) as Box<dyn WorkUnit>);
    if let Some((ops, secs)) = limit {
        spec = spec.with_rate_limit(ops, secs);
    }
    let runner = WorkerBuilder::new(0)
        .spec(spec)
        .stats_tx(tx)
        .cancel(cancel_rx)
        .build()
        .expect("Failed to build worker");
    (runner, rx, cancel_tx)
}

// ============================================================================
// Operation-bound
// ============================================================================

#[tokio::test]
async fn test_operation_bound_runs_exact_count() {
    let probe = Probe::default();
    let (runner, rx) = operation_bound_runner(MockWork::new(&probe), 25, None);
    let drain = spawn_drain(rx);

    let stats = runner.run().await.expect("Worker failed");
    let total = drain.await.expect("drain task panicked");

    assert_eq!(stats.operations, 25);
    assert_eq!(probe.performed(), 25);
    assert_eq!(total.operations, 25);
    assert_eq!(probe.stopped(), 1);
}

#[tokio::test]
async fn test_operation_bound_counts_errors_and_continues() {
    let probe = Probe::default();
    let work = MockWork::new(&probe).with_fail_every(3);
    let (runner, rx) = operation_bound_runner(work, 9, None);
    let drain = spawn_drain(rx);

    let stats = runner.run().await.expect("Worker failed");
    let total = drain.await.expect("drain task panicked");

    assert_eq!(stats.operations, 9);
    assert_eq!(total.errors, 3);
    assert_eq!(total.operations, 6);
    assert_eq!(probe.stopped(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_operation_bound_with_rate_limit() {
    let probe = Probe::default();
    let (runner, rx) = operation_bound_runner(MockWork::new(&probe), 10, Some((5, 1)));
    let drain = spawn_drain(rx);

    let start = Instant::now();
    let stats = runner.run().await.expect("Worker failed");
    drain.await.expect("drain task panicked");

    // two full windows, each slept out
    assert_eq!(stats.operations, 10);
    assert_eq!(stats.windows, 2);
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_panicking_work_is_still_stopped() {
    let probe = Probe::default();
    let work = MockWork::new(&probe).with_panic_at(4);
    let (runner, rx) = operation_bound_runner(work, 10, None);
    let drain = spawn_drain(rx);

    let result = runner.run().await;
    let total = drain.await.expect("drain task panicked");

    match result {
        Err(HarnessError::Worker { worker_id, message }) => {
            assert_eq!(worker_id, 0);
            assert!(message.contains("simulated failure at op 4"));
        }
        other => panic!("expected worker error, got {other:?}"),
    }
    assert_eq!(probe.performed(), 4);
    assert_eq!(total.operations, 3);
    assert_eq!(probe.stopped(), 1);
}

// ============================================================================
// Duration-bound
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_duration_bound_stops_on_cancel() {
    let probe = Probe::default();
    let work = MockWork::new(&probe).with_delay(Duration::from_millis(10));
    let (runner, rx, cancel_tx) = duration_bound_runner(work, None);
    let drain = spawn_drain(rx);

    let handle = tokio::spawn(runner.run());
    tokio::time::sleep(Duration::from_millis(105)).await;
    cancel_tx.send(()).expect("Failed to send cancel");

    let stats = handle
        .await
        .expect("Worker task panicked")
        .expect("Worker failed");
    let total = drain.await.expect("drain task panicked");

    // ~10 ops of 10ms each, plus the one in flight when the signal landed
    assert!((10..=11).contains(&stats.operations), "ops = {}", stats.operations);
    assert_eq!(total.operations, stats.operations);
    assert_eq!(probe.stopped(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duration_bound_stops_when_signal_dropped() {
    let probe = Probe::default();
    let work = MockWork::new(&probe).with_delay(Duration::from_millis(10));
    let (runner, rx, cancel_tx) = duration_bound_runner(work, None);
    let drain = spawn_drain(rx);

    let handle = tokio::spawn(runner.run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(cancel_tx);

    let stats = handle
        .await
        .expect("Worker task panicked")
        .expect("Worker failed");
    drain.await.expect("drain task panicked");

    assert!(stats.operations >= 5);
    assert_eq!(probe.stopped(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duration_bound_cancelled_before_first_op() {
    let probe = Probe::default();
    let (runner, rx, cancel_tx) = duration_bound_runner(MockWork::new(&probe), None);
    let drain = spawn_drain(rx);

    cancel_tx.send(()).expect("Failed to send cancel");
    let stats = runner.run().await.expect("Worker failed");
    drain.await.expect("drain task panicked");

    assert_eq!(stats.operations, 0);
    assert_eq!(probe.performed(), 0);
    assert_eq!(probe.stopped(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duration_bound_gating_bound() {
    let probe = Probe::default();
    let (runner, rx, cancel_tx) = duration_bound_runner(MockWork::new(&probe), Some((5, 1)));
    let drain = spawn_drain(rx);

    let handle = tokio::spawn(runner.run());
    tokio::time::sleep(Duration::from_secs(3)).await;
    cancel_tx.send(()).expect("Failed to send cancel");

    let stats = handle
        .await
        .expect("Worker task panicked")
        .expect("Worker failed");
    drain.await.expect("drain task panicked");

    // 5 ops per window over 3 windows, one window of slack
    assert!(stats.operations >= 15, "ops = {}", stats.operations);
    assert!(stats.operations <= 20, "ops = {}", stats.operations);
    assert_eq!(probe.stopped(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duration_bound_exits_within_one_gating_cycle() {
    let probe = Probe::default();
    let (runner, rx, cancel_tx) = duration_bound_runner(MockWork::new(&probe), Some((5, 1)));
    let drain = spawn_drain(rx);

    let handle = tokio::spawn(runner.run());
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let cancelled_at = Instant::now();
    cancel_tx.send(()).expect("Failed to send cancel");

    let stats = handle
        .await
        .expect("Worker task panicked")
        .expect("Worker failed");
    drain.await.expect("drain task panicked");

    let ended_at = stats.ended_at.expect("end time recorded");
    assert!(ended_at.duration_since(cancelled_at) <= Duration::from_secs(1));
    assert_eq!(probe.stopped(), 1);
}
