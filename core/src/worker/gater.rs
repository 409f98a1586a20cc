//! Per-worker operation gating

use tokio::time::{sleep, Instant};

use crate::config::RateLimit;

/// Fixed-window throttle owned by a single runner
///
/// After every operation the runner calls [`gate`](Self::gate). Once
/// `ops_per_interval` operations have been counted in the current window the
/// gater sleeps out whatever remains of the window, then opens a new one.
/// The bound is soft: sleep slack can let a window run slightly long, never
/// short.
#[derive(Debug)]
pub struct OperationGater {
    limit: RateLimit,
    window_start: Instant,
    ops_in_window: u64,
}

impl OperationGater {
    /// Create a gater whose first window starts now
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            window_start: Instant::now(),
            ops_in_window: 0,
        }
    }

    /// Count one completed operation, sleeping if the window is full
    ///
    /// Returns `true` if a new window was opened.
    pub async fn gate(&mut self) -> bool {
        self.ops_in_window += 1;

        if !self.limit.is_enabled() || self.ops_in_window < self.limit.ops_per_interval {
            return false;
        }

        let elapsed = self.window_start.elapsed();
        if elapsed < self.limit.interval {
            sleep(self.limit.interval - elapsed).await;
        }

        self.ops_in_window = 0;
        self.window_start = Instant::now();
        true
    }

    /// Operations counted in the current window
    pub fn ops_in_window(&self) -> u64 {
        self.ops_in_window
    }

    /// The configured limit
    pub fn limit(&self) -> RateLimit {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_gater_disabled_never_sleeps() {
        let mut gater = OperationGater::new(RateLimit::unlimited());
        let start = Instant::now();
        for _ in 0..1_000 {
            assert!(!gater.gate().await);
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(gater.ops_in_window(), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gater_zero_interval_is_disabled() {
        let mut gater = OperationGater::new(RateLimit::new(1, 0));
        let start = Instant::now();
        for _ in 0..10 {
            gater.gate().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gater_sleeps_out_window() {
        let mut gater = OperationGater::new(RateLimit::new(5, 1));
        let start = Instant::now();

        for _ in 0..4 {
            assert!(!gater.gate().await);
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        // fifth op fills the window
        assert!(gater.gate().await);
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(gater.ops_in_window(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gater_no_sleep_when_window_already_elapsed() {
        let mut gater = OperationGater::new(RateLimit::new(2, 1));
        gater.gate().await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let before = Instant::now();
        assert!(gater.gate().await);
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gater_bounds_ops_per_window() {
        let n = 5;
        let mut gater = OperationGater::new(RateLimit::new(n, 1));
        let start = Instant::now();
        let mut completed_at = Vec::new();

        for _ in 0..(n * 4) {
            completed_at.push(start.elapsed());
            gater.gate().await;
        }

        // count ops starting inside any one-second window
        for &t in &completed_at {
            let in_window = completed_at
                .iter()
                .filter(|&&u| u >= t && u < t + Duration::from_secs(1))
                .count() as u64;
            assert!(in_window <= n, "{in_window} ops in window starting at {t:?}");
        }
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
