use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::ConvertError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the run failed on its input or schema).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Context about a conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    /// Job name (usually the input path).
    pub name: String,
    /// Name of the record schema being produced.
    pub schema: String,
}

/// Stats reported on a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobStats {
    /// Number of records written.
    pub rows: usize,
    /// Number of chunks flushed.
    pub chunks: usize,
}

/// Events emitted while a run progresses.
#[derive(Debug, Clone)]
pub enum JobEvent {
    RunStarted,
    ChunkStarted { index: usize, first_row: usize, rows: usize },
    ChunkFlushed { index: usize, records: usize },
    RunFinished {
        elapsed: Duration,
        metrics: JobMetricsSnapshot,
    },
}

/// Observer interface for conversion runs.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait JobObserver: Send + Sync {
    /// Called for every [`JobEvent`].
    fn on_event(&self, _event: &JobEvent) {}

    /// Called when the run succeeds.
    fn on_success(&self, _ctx: &JobContext, _stats: JobStats) {}

    /// Called when the run fails.
    fn on_failure(&self, _ctx: &JobContext, _severity: JobSeverity, _error: &ConvertError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &JobContext, severity: JobSeverity, error: &ConvertError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn JobObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn JobObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl JobObserver for CompositeObserver {
    fn on_event(&self, event: &JobEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }

    fn on_success(&self, ctx: &JobContext, stats: JobStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &JobContext, severity: JobSeverity, error: &ConvertError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &JobContext, severity: JobSeverity, error: &ConvertError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs run outcomes and chunk progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn on_event(&self, event: &JobEvent) {
        match event {
            JobEvent::ChunkFlushed { index, records } => {
                debug!(chunk = index, records, "chunk flushed");
            }
            JobEvent::RunFinished { metrics, .. } => debug!(%metrics, "run finished"),
            _ => {}
        }
    }

    fn on_success(&self, ctx: &JobContext, stats: JobStats) {
        info!(
            job = %ctx.name,
            schema = %ctx.schema,
            rows = stats.rows,
            chunks = stats.chunks,
            "conversion succeeded"
        );
    }

    fn on_failure(&self, ctx: &JobContext, severity: JobSeverity, error: &ConvertError) {
        error!(job = %ctx.name, schema = %ctx.schema, ?severity, %error, "conversion failed");
    }

    // The failure itself is already logged by `on_failure`.
    fn on_alert(&self, ctx: &JobContext, severity: JobSeverity, _error: &ConvertError) {
        warn!(job = %ctx.name, ?severity, "alert threshold reached");
    }
}

/// Real-time counters for a conversion run.
///
/// The job updates these during execution; callers can snapshot them at any time.
pub struct JobMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    rows_read: AtomicU64,
    rows_converted: AtomicU64,
    chunks_flushed: AtomicU64,
}

impl JobMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            rows_read: AtomicU64::new(0),
            rows_converted: AtomicU64::new(0),
            chunks_flushed: AtomicU64::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.rows_read.store(0, Ordering::SeqCst);
        self.rows_converted.store(0, Ordering::SeqCst);
        self.chunks_flushed.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_row_read(&self) {
        let _ = self.rows_read.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_chunk_flushed(&self, records: usize) {
        let _ = self.rows_converted.fetch_add(records as u64, Ordering::SeqCst);
        let _ = self.chunks_flushed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> JobMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        JobMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            rows_read: self.rows_read.load(Ordering::SeqCst),
            rows_converted: self.rows_converted.load(Ordering::SeqCst),
            chunks_flushed: self.chunks_flushed.load(Ordering::SeqCst),
        }
    }
}

impl Default for JobMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of [`JobMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub rows_read: u64,
    pub rows_converted: u64,
    pub chunks_flushed: u64,
}

impl fmt::Display for JobMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, rows_read={}, rows_converted={}, chunks_flushed={}, elapsed={:?}",
            self.run_id, self.rows_read, self.rows_converted, self.chunks_flushed, self.elapsed
        )
    }
}
