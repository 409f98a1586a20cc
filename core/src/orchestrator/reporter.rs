//! Periodic and final reporting

use std::time::Duration;

use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::sink::SharedSink;
use crate::traits::ResultSink;

/// Prints a sink snapshot every interval, and the final summary on stop
///
/// The reporter is the last task stopped, after the aggregator, so the
/// final summary reflects every merged record.
pub struct Reporter<S: ResultSink> {
    sink: SharedSink<S>,
    interval: Duration,
    cancel: oneshot::Receiver<()>,
}

impl<S: ResultSink> Reporter<S> {
    /// Create a reporter printing every `interval`
    pub fn new(sink: SharedSink<S>, interval: Duration, cancel: oneshot::Receiver<()>) -> Self {
        Self {
            sink,
            interval,
            cancel,
        }
    }

    /// Run until cancelled; returns the number of periodic reports printed
    pub async fn run(self) -> u64 {
        let Self {
            sink,
            interval,
            mut cancel,
        } = self;
        let mut reports = 0u64;

        loop {
            match cancel.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Closed) => break,
            }

            sink.lock().await.print_periodic();
            reports += 1;

            tokio::select! {
                _ = &mut cancel => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        sink.lock().await.print_final();
        tracing::debug!(reports, "Reporter stopped");
        reports
    }
}
