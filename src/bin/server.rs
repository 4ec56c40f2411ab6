//! seglog Server Binary
//!
//! Opens a log directory and serves it over TCP.

use std::sync::Arc;

use clap::Parser;
use seglog::network::Server;
use seglog::{Config, Log};
use tracing_subscriber::{fmt, EnvFilter};

/// seglog Server
#[derive(Parser, Debug)]
#[command(name = "seglog-server")]
#[command(about = "Segmented commit log server")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./seglog_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Segment store size in MB before rollover
    #[arg(short = 's', long, default_value = "1024")]
    max_store_mb: u64,

    /// Segment index size in KB (bounds records per segment)
    #[arg(short = 'i', long, default_value = "10240")]
    max_index_kb: u64,

    /// Offset of the first record in a new log
    #[arg(long, default_value = "0")]
    initial_offset: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,seglog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("seglog Server v{}", seglog::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .worker_threads(args.workers)
        .max_store_bytes(args.max_store_mb * 1024 * 1024)
        .max_index_bytes(args.max_index_kb * 1024)
        .initial_offset(args.initial_offset)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tracing::debug!(
        "Segments roll over at {} store bytes or {} records",
        config.segment.max_store_bytes,
        config.segment.records_per_segment()
    );

    let log = match Log::open(&config.data_dir, config.segment) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            tracing::error!("Failed to open log: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Log opened: {} segment(s), lowest offset {}, highest offset {:?}",
        log.segment_count(),
        log.lowest_offset(),
        log.highest_offset()
    );

    let server = match Server::bind(config, Arc::clone(&log)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    // Workers have exited, so this is the last reference
    drop(server);
    match Arc::try_unwrap(log) {
        Ok(log) => {
            if let Err(e) = log.close() {
                tracing::error!("Failed to close log cleanly: {}", e);
                std::process::exit(1);
            }
            tracing::info!("Log closed");
        }
        Err(_) => tracing::warn!("Log still referenced at shutdown; relying on drop"),
    }
}
