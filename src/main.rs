use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use text_to_avro::config::JobConfig;
use text_to_avro::execution::{
    convert_file, CompositeObserver, JobEvent, JobObserver, TracingObserver,
};

#[derive(Parser)]
#[command(
    name = "text-to-avro",
    about = "Convert delimited text or spreadsheet rows into an Avro container file"
)]
struct Cli {
    /// Input file (delimited text, or .xlsx/.xls/.xlsm/.xlsb/.ods)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Avro record schema (JSON)
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Output Avro file [default: out.avro]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Field delimiter for delimited text [default: ,]
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Leading lines (or sheet rows) to skip [default: 0]
    #[arg(long)]
    lines_to_skip: Option<usize>,

    /// Date pattern, e.g. yyyy-MM-dd or dd/MM/yyyy [default: yyyy-MM-dd]
    #[arg(long)]
    date_pattern: Option<String>,

    /// Cell text treated as null [default: empty]
    #[arg(long)]
    null_token: Option<String>,

    /// Rows per flushed chunk [default: 10]
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Worker threads used to convert a chunk [default: 1]
    #[arg(long)]
    threads: Option<usize>,

    /// Sheet to read from a workbook [default: first sheet]
    #[arg(long)]
    sheet: Option<String>,

    /// JSON job config; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, mut cfg: JobConfig) -> JobConfig {
        if let Some(v) = self.input {
            cfg.input_file = Some(v);
        }
        if let Some(v) = self.schema {
            cfg.schema_file = Some(v);
        }
        if let Some(v) = self.output {
            cfg.output_file = v;
        }
        if let Some(v) = self.delimiter {
            cfg.delimiter = v;
        }
        if let Some(v) = self.lines_to_skip {
            cfg.lines_to_skip = v;
        }
        if let Some(v) = self.date_pattern {
            cfg.date_pattern = v;
        }
        if let Some(v) = self.null_token {
            cfg.null_token = v;
        }
        if let Some(v) = self.chunk_size {
            cfg.chunk_size = v;
        }
        if let Some(v) = self.threads {
            cfg.threads = v;
        }
        if let Some(v) = self.sheet {
            cfg.sheet = Some(v);
        }
        cfg
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Records whether the run got far enough to create the output file.
#[derive(Default)]
struct OutputCreated(AtomicBool);

impl JobObserver for OutputCreated {
    fn on_event(&self, event: &JobEvent) {
        if let JobEvent::RunStarted = event {
            self.0.store(true, Ordering::SeqCst);
        }
    }
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => warn!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial output"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let file_config = JobConfig::load(cli.config.as_deref()).context("failed to load job config")?;
    let config = cli.apply(file_config);
    config.validate().context("invalid job config")?;

    let input = config
        .input_file
        .as_deref()
        .context("no input file given (use --input or input_file in the config)")?;
    config
        .schema_file
        .as_deref()
        .context("no schema file given (use --schema or schema_file in the config)")?;
    info!(input = %input.display(), output = %config.output_file.display(), "starting conversion");

    let created = Arc::new(OutputCreated::default());
    let observers: Vec<Arc<dyn JobObserver>> = vec![Arc::new(TracingObserver), created.clone()];
    let observer = CompositeObserver::new(observers);

    match convert_file(&config, Some(Arc::new(observer))) {
        Ok(stats) => {
            info!(rows = stats.rows, chunks = stats.chunks, "wrote {}", config.output_file.display());
            Ok(())
        }
        Err(e) => {
            if created.0.load(Ordering::SeqCst) {
                remove_partial_output(&config.output_file);
            }
            Err(e).with_context(|| format!("failed to convert {}", input.display()))
        }
    }
}
