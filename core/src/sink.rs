//! Built-in result sink for [`Stats`] records
//!
//! [`CounterSink`] prints a dstat-style table: for every counter the
//! interval delta ("iter"), the cumulative rate ("cum/s") and the running
//! total. Errors are reported as a total only.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::stats::{Stats, StatsRecord};
use crate::traits::ResultSink;

/// Sink shared between its single writer (aggregator) and single reader (reporter)
pub type SharedSink<S> = Arc<Mutex<S>>;

/// Rows printed between repeated headers
const HEADER_EVERY: u64 = 20;

/// Counters reported with iter/cum/total columns; `errors` is appended as total only
const RATE_COLUMNS: usize = 5;

/// Since-last-report view of a [`CounterSink`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSnapshot {
    /// Time since the sink was created
    pub elapsed: Duration,
    /// Time covered by `delta`
    pub interval: Duration,
    /// Counts merged during the interval
    pub delta: Stats,
    /// Counts merged since the start
    pub totals: Stats,
}

impl IntervalSnapshot {
    /// Cumulative rate per second of a total count
    pub fn cumulative_rate(&self, total: u64) -> f64 {
        per_second(total, self.elapsed)
    }
}

fn per_second(count: u64, over: Duration) -> f64 {
    let secs = over.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Default sink: cumulative [`Stats`] plus last-reported snapshot
pub struct CounterSink<W = io::Stdout> {
    out: W,
    totals: Stats,
    last_reported: Stats,
    started_at: Instant,
    last_report_at: Instant,
    rows: u64,
}

impl CounterSink<io::Stdout> {
    /// Sink printing to stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> CounterSink<W> {
    /// Sink printing to `out`; the run clock starts now
    pub fn new(out: W) -> Self {
        let now = Instant::now();
        Self {
            out,
            totals: Stats::default(),
            last_reported: Stats::default(),
            started_at: now,
            last_report_at: now,
            rows: 0,
        }
    }

    /// Everything merged so far
    pub fn totals(&self) -> Stats {
        self.totals
    }

    /// Compute the delta since the last call and reset it
    pub fn take_interval(&mut self) -> IntervalSnapshot {
        let now = Instant::now();
        let snapshot = IntervalSnapshot {
            elapsed: now.duration_since(self.started_at),
            interval: now.duration_since(self.last_report_at),
            delta: self.totals.delta_since(&self.last_reported),
            totals: self.totals,
        };
        self.last_reported = self.totals;
        self.last_report_at = now;
        snapshot
    }

    /// Consume the sink, returning its writer
    pub fn into_writer(self) -> W {
        self.out
    }

    fn write_header(&mut self) -> io::Result<()> {
        let mut line = format!("{:>9}", "elapsed");
        for (name, _) in self.totals.counters().iter().take(RATE_COLUMNS) {
            line.push_str(&format!(" | {name:^32}"));
        }
        line.push_str(&format!(" | {:>8}", "errors"));
        writeln!(self.out, "{line}")?;

        let mut units = format!("{:>9}", "");
        for _ in 0..RATE_COLUMNS {
            units.push_str(&format!(" | {:>8} {:>12} {:>10}", "iter", "cum/s", "total"));
        }
        units.push_str(&format!(" | {:>8}", "total"));
        writeln!(self.out, "{units}")
    }

    fn write_row(&mut self, snapshot: &IntervalSnapshot) -> io::Result<()> {
        let mut line = format!("{:>8.1}s", snapshot.elapsed.as_secs_f64());
        let deltas = snapshot.delta.counters();
        let totals = snapshot.totals.counters();
        for ((_, iter), (_, total)) in deltas.iter().zip(totals.iter()).take(RATE_COLUMNS) {
            line.push_str(&format!(
                " | {:>8} {:>12.1} {:>10}",
                iter,
                snapshot.cumulative_rate(*total),
                total
            ));
        }
        line.push_str(&format!(" | {:>8}", snapshot.totals.errors));
        writeln!(self.out, "{line}")
    }

    fn write_periodic(&mut self, snapshot: &IntervalSnapshot, header: bool) -> io::Result<()> {
        if header {
            self.write_header()?;
        }
        self.write_row(snapshot)?;
        self.out.flush()
    }

    fn write_final(&mut self) -> io::Result<()> {
        let elapsed = self.started_at.elapsed();
        let mut line = format!("Benchmark done after {:.1}s.", elapsed.as_secs_f64());
        for (name, total) in self.totals.counters().iter().take(RATE_COLUMNS) {
            line.push_str(&format!(
                " {name}: {total} ({:.1}/s),",
                per_second(*total, elapsed)
            ));
        }
        line.push_str(&format!(" errors: {}", self.totals.errors));
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}

impl<W: Write + Send + 'static> ResultSink for CounterSink<W> {
    type Record = Stats;

    fn merge_record(&mut self, record: Stats) {
        self.totals.merge(record);
    }

    fn print_periodic(&mut self) {
        let snapshot = self.take_interval();
        let header_due = self.rows % HEADER_EVERY == 0;
        self.rows += 1;

        if let Err(e) = self.write_periodic(&snapshot, header_due) {
            tracing::warn!(error = %e, "Failed to write periodic report");
        }
    }

    fn print_final(&mut self) {
        if let Err(e) = self.write_final() {
            tracing::warn!(error = %e, "Failed to write final report");
        }
    }
}

impl<W> std::fmt::Debug for CounterSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterSink")
            .field("totals", &self.totals)
            .field("last_reported", &self.last_reported)
            .field("rows", &self.rows)
            .finish()
    }
}
