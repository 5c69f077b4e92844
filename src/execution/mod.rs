//! Chunked conversion runs.
//!
//! A [`ConversionJob`] drives one pass over an input:
//!
//! - reads raw rows sequentially from a [`RowReader`]
//! - buffers them into chunks of [`JobOptions::chunk_size`] rows
//! - assembles each chunk (on a `rayon` pool when [`JobOptions::num_threads`] is above one,
//!   preserving row order)
//! - writes and flushes the chunk to a [`RecordSink`] before reading further input
//!
//! The first error aborts the run. Chunks flushed before the error stay in the sink; callers that
//! need all-or-nothing output discard it.

mod observer;

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::assembler::RecordAssembler;
use crate::config::JobConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::ingestion::{open_reader, RowReader};
use crate::output::{avro_schema, AvroContainerWriter, RecordSink};
use crate::schema::load_schema;
use crate::types::{RawRow, TypedRecord};

pub use observer::{
    CompositeObserver, JobContext, JobEvent, JobMetrics, JobMetricsSnapshot, JobObserver, JobSeverity,
    JobStats, TracingObserver,
};

/// Default number of records per flushed chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Configuration for a [`ConversionJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Number of rows per chunk.
    pub chunk_size: usize,
    /// Worker threads used to assemble a chunk. `1` assembles on the calling thread.
    pub num_threads: usize,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: JobSeverity,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            num_threads: 1,
            alert_at_or_above: JobSeverity::Critical,
        }
    }
}

/// One conversion run: rows in, chunks of typed records out.
///
/// ```rust
/// use text_to_avro::assembler::RecordAssembler;
/// use text_to_avro::convert::ConversionConfig;
/// use text_to_avro::execution::{ConversionJob, JobOptions};
/// use text_to_avro::ingestion::VecReader;
/// use text_to_avro::output::VecSink;
/// use text_to_avro::schema::{FieldSchema, PrimitiveType, RecordSchema};
/// use text_to_avro::types::RawRow;
///
/// # fn main() -> Result<(), text_to_avro::ConvertError> {
/// let schema = RecordSchema::new(
///     "ids",
///     vec![("id".to_string(), FieldSchema::Primitive(PrimitiveType::Int))],
/// )?;
/// let assembler = RecordAssembler::new(schema, &ConversionConfig::default())?;
/// let job = ConversionJob::new(assembler, JobOptions { chunk_size: 2, ..Default::default() })?;
///
/// let rows = (1..=5).map(|i| RawRow::from_strings(i, [i.to_string()])).collect();
/// let mut sink = VecSink::default();
/// let stats = job.run(&mut VecReader::new(rows), &mut sink)?;
///
/// assert_eq!(stats.rows, 5);
/// assert_eq!(sink.chunk_sizes, vec![2, 2, 1]);
/// # Ok(())
/// # }
/// ```
pub struct ConversionJob {
    assembler: RecordAssembler,
    opts: JobOptions,
    pool: Option<ThreadPool>,
    name: String,
    observer: Option<Arc<dyn JobObserver>>,
    metrics: Arc<JobMetrics>,
}

impl ConversionJob {
    /// Create a job around a prepared assembler.
    ///
    /// Fails if `chunk_size` or `num_threads` is zero, or the worker pool cannot be built.
    pub fn new(assembler: RecordAssembler, opts: JobOptions) -> ConvertResult<Self> {
        if opts.chunk_size == 0 {
            return Err(ConvertError::config("chunk_size must be > 0"));
        }
        if opts.num_threads == 0 {
            return Err(ConvertError::config("num_threads must be > 0"));
        }

        let pool = if opts.num_threads > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(opts.num_threads)
                .build()
                .map_err(|e| ConvertError::config(format!("failed to build worker pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            name: assembler.schema().name.clone(),
            assembler,
            opts,
            pool,
            observer: None,
            metrics: Arc::new(JobMetrics::new()),
        })
    }

    /// Name reported to observers (defaults to the record name).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach an observer for run outcomes and progress events.
    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time run metrics.
    pub fn metrics(&self) -> Arc<JobMetrics> {
        Arc::clone(&self.metrics)
    }

    /// The assembler rows are converted with.
    pub fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }

    /// Convert every row of `reader` into `sink`, then finish the sink.
    ///
    /// When an observer is configured, this reports:
    ///
    /// - `on_success` on success, with row and chunk counts
    /// - `on_failure` on failure, with a computed severity
    /// - `on_alert` on failure when the computed severity is >= `alert_at_or_above`
    pub fn run<R, S>(&self, reader: &mut R, sink: &mut S) -> ConvertResult<JobStats>
    where
        R: RowReader + ?Sized,
        S: RecordSink + ?Sized,
    {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(JobEvent::RunStarted);
        info!(
            job = %self.name,
            chunk_size = self.opts.chunk_size,
            threads = self.opts.num_threads,
            "conversion started"
        );

        let result = self.run_chunks(reader, sink);

        self.metrics.end_run(start.elapsed());
        self.emit(JobEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });

        if let Some(obs) = self.observer.as_ref() {
            let ctx = JobContext {
                name: self.name.clone(),
                schema: self.assembler.schema().name.clone(),
            };
            match &result {
                Ok(stats) => obs.on_success(&ctx, *stats),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.opts.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result
    }

    fn run_chunks<R, S>(&self, reader: &mut R, sink: &mut S) -> ConvertResult<JobStats>
    where
        R: RowReader + ?Sized,
        S: RecordSink + ?Sized,
    {
        let mut stats = JobStats { rows: 0, chunks: 0 };
        let mut chunk: Vec<RawRow> = Vec::with_capacity(self.opts.chunk_size);

        loop {
            let next = reader.next_row()?;
            let done = next.is_none();
            if let Some(row) = next {
                self.metrics.on_row_read();
                chunk.push(row);
            }

            if chunk.len() == self.opts.chunk_size || (done && !chunk.is_empty()) {
                let records = self.assemble_chunk(stats.chunks, &chunk)?;
                sink.write_chunk(&records)?;

                self.metrics.on_chunk_flushed(records.len());
                self.emit(JobEvent::ChunkFlushed {
                    index: stats.chunks,
                    records: records.len(),
                });
                stats.rows += records.len();
                stats.chunks += 1;
                chunk.clear();
            }

            if done {
                break;
            }
        }

        sink.finish()?;
        Ok(stats)
    }

    fn assemble_chunk(&self, index: usize, chunk: &[RawRow]) -> ConvertResult<Vec<TypedRecord>> {
        let first_row = chunk.first().map_or(0, |r| r.number);
        debug!(chunk = index, first_row, rows = chunk.len(), "assembling chunk");
        self.emit(JobEvent::ChunkStarted {
            index,
            first_row,
            rows: chunk.len(),
        });

        match &self.pool {
            None => chunk.iter().map(|row| self.assembler.assemble(row)).collect(),
            Some(pool) => {
                let results: Vec<ConvertResult<TypedRecord>> = pool.install(|| {
                    chunk
                        .par_iter()
                        .map(|row| self.assembler.assemble(row))
                        .collect()
                });
                // Report the earliest failing row, whichever worker saw it.
                results.into_iter().collect()
            }
        }
    }

    fn emit(&self, event: JobEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

/// Convert `config.input_file` into an Avro container at `config.output_file`.
///
/// The schema is loaded and the input opened before the output file is created. On failure the
/// output may hold a readable prefix of whole chunks; removing it is left to the caller.
pub fn convert_file(
    config: &JobConfig,
    observer: Option<Arc<dyn JobObserver>>,
) -> ConvertResult<JobStats> {
    let ingestion = config.ingestion_options()?;
    let input = config
        .input_file
        .as_deref()
        .ok_or_else(|| ConvertError::config("input_file is not set"))?;
    let schema_file = config
        .schema_file
        .as_deref()
        .ok_or_else(|| ConvertError::config("schema_file is not set"))?;

    let schema = load_schema(schema_file)?;
    let writer_schema = avro_schema(&schema)?;
    let assembler = RecordAssembler::new(schema, &config.conversion_config())?;

    let mut job = ConversionJob::new(assembler, config.job_options())?
        .with_name(input.display().to_string());
    if let Some(observer) = observer {
        job = job.with_observer(observer);
    }

    let mut reader = open_reader(input, &ingestion)?;
    let out = BufWriter::new(File::create(&config.output_file)?);
    let mut sink = AvroContainerWriter::new(&writer_schema, out);
    job.run(&mut reader, &mut sink)
}

fn severity_for_error(e: &ConvertError) -> JobSeverity {
    match e {
        ConvertError::Io(_) => JobSeverity::Critical,
        ConvertError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => JobSeverity::Critical,
            _ => JobSeverity::Error,
        },
        ConvertError::Avro(err) => {
            if error_chain_contains_io(err) {
                JobSeverity::Critical
            } else {
                JobSeverity::Error
            }
        }
        #[cfg(feature = "excel")]
        ConvertError::Excel(_) => JobSeverity::Error,
        ConvertError::Json(_)
        | ConvertError::Schema { .. }
        | ConvertError::Config { .. }
        | ConvertError::RowShape { .. }
        | ConvertError::Parse { .. }
        | ConvertError::Arithmetic { .. } => JobSeverity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}
