use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tsload::batch::open_input;
use tsload::runner::load_session;
use tsload::{store, BatchScanner, BufferPool, Config, Loader, Result, RetryPolicy, Session};

#[derive(Parser)]
#[command(name = "tsload")]
#[command(about = "Load line-protocol benchmark data into a column-oriented time series store")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Input file; reads stdin when absent
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Lines per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Concurrent batch workers (0 = one per CPU)
    #[arg(long)]
    workers: Option<usize>,

    /// Read the input without transforming or inserting it
    #[arg(long)]
    no_load: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("Load failed: {}", e);
        eprintln!("tsload: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path.clone())?,
        None => Config::default(),
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.config {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("Using default configuration"),
    }

    if let Some(batch_size) = cli.batch_size {
        config.loader.batch_size = batch_size;
    }
    if let Some(workers) = cli.workers {
        config.loader.workers = workers;
    }
    if cli.no_load {
        config.loader.do_load = false;
    }
    config.validate()?;

    let input = open_input(cli.file.as_deref())?;
    let scanner = BatchScanner::new(
        input,
        BufferPool::new(config.loader.workers.max(1) * 2),
        config.loader.batch_size,
    );

    let session = Session::new(store::from_config(&config.sink)?, &config.session.endpoints);
    let loader = Loader::new(session.store(), RetryPolicy::from(&config.retry))
        .with_do_load(config.loader.do_load);
    let summary = load_session(&session, scanner, &loader, config.loader.workers)?;

    info!(
        "Loaded {} rows ({} metrics) in {} batches, {} failed, {} malformed records",
        summary.rows,
        summary.metrics,
        summary.batches,
        summary.failed_batches,
        summary.parse_failures
    );
    info!(
        "Elapsed {:.3}s, {:.2} rows/sec, {:.2} metrics/sec",
        summary.elapsed.as_secs_f64(),
        summary.rows_per_sec(),
        summary.metrics_per_sec()
    );

    Ok(())
}
