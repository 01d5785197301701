//! TCP Extended Statistics - Userspace Program
//!
//! Loads the tcp_estats eBPF object, attaches its tracing programs, ingests
//! the seven per-category statistics streams and dumps the per-connection
//! tables on shutdown.
//!
//! ## Usage
//!
//! ```bash
//! # Run until Ctrl-C and print the text dump
//! sudo ./tcp-estats --ebpf-object path/to/tcp_estats.o
//!
//! # Run for 60 seconds and export to JSON
//! sudo ./tcp-estats --ebpf-object tcp_estats.o --duration 60 --format json --output estats.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tcp_estats::{
    db::{EstatsDb, Snapshot},
    events::{EventProcessor, IngestCounters, IngestStats},
    exporter::{ExporterType, JsonExporter, SnapshotExporter, TextExporter},
    loader::ProbeLoader,
    source::RingBufSource,
    types::Category,
    EstatsError,
};
use tokio::{
    signal::{self, unix::SignalKind},
    sync::watch,
    task::{JoinError, JoinSet},
    time::{sleep, timeout, Instant},
};

/// Outcome of one reader task as seen by the supervisor
type ReaderOutcome = (Category, Result<Result<IngestStats, EstatsError>, JoinError>);

/// Per-connection TCP extended statistics using eBPF
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the pre-compiled eBPF object file
    #[clap(long)]
    ebpf_object: PathBuf,

    /// Duration to run (in seconds, 0 = until interrupted)
    #[clap(short, long, default_value_t = 0)]
    duration: u64,

    /// Output file for the dump (stdout if omitted)
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Output format (json, text)
    #[clap(short, long, default_value = "text")]
    format: String,

    /// Pretty-print JSON output
    #[clap(long)]
    pretty: bool,

    /// Verbose logging, including every applied record
    #[clap(short, long)]
    verbose: bool,

    /// Progress reporting interval in seconds (0 = disabled)
    #[clap(long, default_value_t = 10)]
    progress_interval: u64,

    /// Seconds to wait for the readers to drain after shutdown
    #[clap(long, default_value_t = 2)]
    grace_period: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    print_banner();

    // Parse export format
    let export_format = match args.format.to_lowercase().as_str() {
        "json" => ExporterType::Json,
        "text" | "txt" => ExporterType::Text,
        _ => anyhow::bail!("Unsupported format: {}. Use json or text", args.format),
    };

    info!("Starting tcp_estats...");
    info!(
        "   Duration: {} seconds",
        if args.duration == 0 {
            "infinite".to_string()
        } else {
            args.duration.to_string()
        }
    );
    match &args.output {
        Some(path) => info!("   Output: {:?}", path),
        None => info!("   Output: stdout"),
    }
    info!("   Format: {:?}", export_format);

    // Load eBPF program
    let mut loader = ProbeLoader::load(&args.ebpf_object)?;

    // Initialize eBPF logger (optional)
    loader.init_logger();

    // Attach fentry/fexit programs
    loader.attach_programs()?;

    // One ring buffer per statistics table
    let rings = loader.take_ring_buffers()?;

    let db = Arc::new(EstatsDb::new());
    let processor = EventProcessor::new(Arc::clone(&db), args.verbose);
    let (close_tx, close_rx) = watch::channel(false);

    let mut readers = JoinSet::new();
    for (category, ring) in rings {
        let source = RingBufSource::new(ring, close_rx.clone()).with_context(|| {
            format!("Failed to register {} ring buffer", category.map_name())
        })?;
        let handle = processor.spawn_reader(category, source);
        readers.spawn(async move { (category, handle.await) });
    }
    drop(close_rx);

    let progress = processor.spawn_progress_reporter(args.progress_interval);

    info!("Collecting statistics...");

    let start_time = Instant::now();
    let duration = (args.duration > 0).then(|| Duration::from_secs(args.duration));

    wait_for_shutdown(duration, &mut readers).await?;

    // Every source returns closed on its next read
    let _ = close_tx.send(true);

    let grace = Duration::from_secs(args.grace_period);
    let drained = timeout(grace, async {
        while let Some(joined) = readers.join_next().await {
            let (category, stats) = reader_outcome(joined)?;
            debug!(
                "{} table reader finished after {} records",
                category.name(),
                stats.applied
            );
        }
        Ok::<(), anyhow::Error>(())
    })
    .await;

    match drained {
        Ok(result) => result?,
        Err(_) => warn!(
            "Readers still running after {}s grace period, exporting current state",
            args.grace_period
        ),
    }

    if let Some(progress) = progress {
        progress.abort();
    }

    info!("Generating statistics dump...");

    let snapshot = db.snapshot();

    let exporter: Box<dyn SnapshotExporter> = match export_format {
        ExporterType::Json => Box::new(JsonExporter::new(args.output.clone(), args.pretty)),
        ExporterType::Text => Box::new(TextExporter::new(args.output.clone())),
    };
    exporter.export(&snapshot)?;

    if let Some(path) = &args.output {
        info!("Statistics written to {:?}", path);
    }

    print_summary(
        &snapshot,
        processor.counters(),
        start_time.elapsed().as_secs(),
    );

    Ok(())
}

/// Block until the duration elapses, a signal arrives or a reader fails
async fn wait_for_shutdown(
    duration: Option<Duration>,
    readers: &mut JoinSet<ReaderOutcome>,
) -> Result<()> {
    let mut sigterm = signal::unix::signal(SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    let deadline = async {
        match duration {
            Some(d) => sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Duration reached, shutting down...");
                return Ok(());
            }
            res = signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, shutting down...");
                return Ok(());
            }
            _ = sigterm.recv() => {
                info!("Terminated, shutting down...");
                return Ok(());
            }
            Some(joined) = readers.join_next() => {
                let (category, stats) = reader_outcome(joined)?;
                warn!(
                    "{} table stream ended early after {} records",
                    category.name(),
                    stats.applied
                );
            }
        }
    }
}

/// Flatten a finished reader into its stats, failing on a fatal loop error
fn reader_outcome(joined: Result<ReaderOutcome, JoinError>) -> Result<(Category, IngestStats)> {
    let (category, result) = joined.context("Reader supervisor task failed")?;
    let stats = result
        .with_context(|| format!("{} table reader panicked", category.name()))?
        .with_context(|| format!("{} table ingestion failed", category.name()))?;
    Ok((category, stats))
}

fn print_banner() {
    eprintln!(
        r#"
╔═══════════════════════════════════════════════════╗
║       tcp_estats - TCP Extended Statistics        ║
║              eBPF Connection Tracker              ║
╚═══════════════════════════════════════════════════╝
    "#
    );
}

fn print_summary(snapshot: &Snapshot, counters: &IngestCounters, elapsed: u64) {
    info!("");
    info!("============================================");
    info!("             Summary Report");
    info!("============================================");
    info!("");
    info!("  Snapshot taken:     {}", snapshot.taken_at.to_rfc3339());
    info!("  Duration:           {} seconds", elapsed);
    info!("  Unique connections: {}", snapshot.connections.len());
    info!("");
    info!("  Records:");
    info!("    applied:     {:>10}", counters.applied());
    info!("    dropped:     {:>10}", counters.dropped());
    info!("    read errors: {:>10}", counters.read_errors());
    info!("");
    info!("  Variables set per table:");
    for category in Category::ALL {
        let set: usize = snapshot
            .connections
            .iter()
            .map(|(_, tables)| tables.get(category).len())
            .sum();
        info!("    {:<11} {:>10}", format!("{}:", category.name()), set);
    }
    info!("");
    info!("============================================");
}
