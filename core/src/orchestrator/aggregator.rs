//! Fan-in of stats records from every worker

use tokio::sync::oneshot;

use crate::channel::StatsReceiver;
use crate::sink::SharedSink;
use crate::traits::ResultSink;

/// Single consumer of the stats channel
///
/// Merges every record into the shared sink until told to stop. Stopping
/// closes the channel and folds whatever is still buffered, so no record
/// accepted by the channel is lost.
pub struct ResultAggregator<S: ResultSink> {
    sink: SharedSink<S>,
    stats_rx: StatsReceiver<S::Record>,
    cancel: oneshot::Receiver<()>,
}

impl<S: ResultSink> ResultAggregator<S> {
    /// Create an aggregator feeding `sink`
    pub fn new(
        sink: SharedSink<S>,
        stats_rx: StatsReceiver<S::Record>,
        cancel: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            sink,
            stats_rx,
            cancel,
        }
    }

    /// Run until cancelled; returns the number of records merged
    pub async fn run(self) -> u64 {
        let Self {
            sink,
            mut stats_rx,
            mut cancel,
        } = self;
        let mut merged = 0u64;

        tracing::debug!("Aggregator started");

        loop {
            tokio::select! {
                biased;

                _ = &mut cancel => break,

                record = stats_rx.recv() => match record {
                    Some(record) => {
                        sink.lock().await.merge_record(record);
                        merged += 1;
                    }
                    None => {
                        // every producer is gone; hold until told to stop
                        let _ = (&mut cancel).await;
                        break;
                    }
                },
            }
        }

        stats_rx.close();
        let mut drained = 0u64;
        while let Some(record) = stats_rx.recv().await {
            sink.lock().await.merge_record(record);
            drained += 1;
        }
        merged += drained;

        tracing::debug!(merged, drained, "Aggregator stopped");
        merged
    }
}
