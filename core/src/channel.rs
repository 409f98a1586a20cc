//! Stats channel between workers and the aggregator
//!
//! Many runners hold a [`StatsSender`]; exactly one [`StatsReceiver`] exists
//! and is owned by the aggregator. The channel is bounded so a stalled
//! aggregator applies backpressure instead of growing memory.

use tokio::sync::mpsc;

use crate::error::{HarnessError, HarnessResult};
use crate::stats::{Stats, StatsRecord};

/// Default stats buffer size (workers -> aggregator)
pub const DEFAULT_STATS_BUFFER: usize = 100;

/// Channel buffer configuration for harness communication
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Stats channel buffer size (workers -> aggregator)
    pub stats_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            stats_buffer: DEFAULT_STATS_BUFFER,
        }
    }
}

impl ChannelConfig {
    /// Create a new channel config with custom stats buffer size
    pub fn with_stats_buffer(mut self, size: usize) -> Self {
        self.stats_buffer = size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> HarnessResult<()> {
        if self.stats_buffer == 0 {
            return Err(HarnessError::config("stats buffer must be at least 1"));
        }
        Ok(())
    }
}

/// Create a bounded stats channel
///
/// # Panics
/// Panics if `config.stats_buffer` is zero; call [`ChannelConfig::validate`] first.
pub fn stats_channel<R: StatsRecord>(config: &ChannelConfig) -> (StatsSender<R>, StatsReceiver<R>) {
    let (tx, rx) = mpsc::channel(config.stats_buffer);
    (StatsSender { tx }, StatsReceiver { rx })
}

/// Producer half handed to every work unit
#[derive(Debug)]
pub struct StatsSender<R: StatsRecord = Stats> {
    tx: mpsc::Sender<R>,
}

impl<R: StatsRecord> Clone for StatsSender<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R: StatsRecord> StatsSender<R> {
    /// Send one record, waiting for buffer space
    ///
    /// Returns `false` if the aggregator is gone. Runners outlive neither the
    /// channel nor the aggregator in a well-ordered shutdown, so the record is
    /// dropped with a debug event rather than surfaced as an error.
    pub async fn send(&self, record: R) -> bool {
        if self.tx.send(record).await.is_err() {
            tracing::debug!("Stats channel closed, dropping record");
            return false;
        }
        true
    }

    /// Remaining buffer capacity
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Consumer half owned by the aggregator
#[derive(Debug)]
pub struct StatsReceiver<R: StatsRecord = Stats> {
    rx: mpsc::Receiver<R>,
}

impl<R: StatsRecord> StatsReceiver<R> {
    /// Receive the next record; `None` once every sender is dropped and the
    /// buffer is empty
    pub async fn recv(&mut self) -> Option<R> {
        self.rx.recv().await
    }

    /// Refuse further sends while keeping buffered records receivable
    pub fn close(&mut self) {
        self.rx.close();
    }
}
