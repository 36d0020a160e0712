//! DuraKV Server Binary
//!
//! Recovers the store from its transaction log, then serves TCP clients.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use durakv::config::{LoggerBackend, RecoveryMode, SyncStrategy};
use durakv::network::Server;
use durakv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// Transaction log backend
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    File,
    Sqlite,
}

/// DuraKV Server
#[derive(Parser, Debug)]
#[command(name = "durakv-server")]
#[command(about = "Key-value store with a write-ahead transaction log")]
#[command(version)]
struct Args {
    /// Transaction log backend
    #[arg(short, long, value_enum, default_value = "file")]
    backend: Backend,

    /// Log file path (file backend)
    #[arg(long, default_value = "transaction.log")]
    log_file: PathBuf,

    /// Database path (sqlite backend)
    #[arg(long, default_value = "transactions.db")]
    db_path: PathBuf,

    /// Table name (sqlite backend)
    #[arg(long, default_value = LoggerBackend::DEFAULT_TABLE)]
    table: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Maximum value size in bytes
    #[arg(long, default_value = "1024")]
    max_value_size: usize,

    /// fsync the file log every N events instead of after every event
    #[arg(long)]
    sync_batch: Option<usize>,

    /// Cut a torn final record from the file log instead of refusing to start
    #[arg(long)]
    truncate_torn_tail: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,durakv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("DuraKV Server v{}", durakv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .max_value_size(args.max_value_size);

    builder = match args.backend {
        Backend::File => {
            tracing::info!("Transaction log file: {}", args.log_file.display());
            builder.file_log(&args.log_file)
        }
        Backend::Sqlite => {
            tracing::info!("Transaction log table: {} in {}", args.table, args.db_path.display());
            builder.sqlite_log(&args.db_path, &args.table)
        }
    };
    if let Some(count) = args.sync_batch {
        builder = builder.sync_strategy(SyncStrategy::EveryNEntries { count });
    }
    if args.truncate_torn_tail {
        builder = builder.recovery_mode(RecoveryMode::TruncateTornTail);
    }
    let config = builder.build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to recover store: {}", e);
            std::process::exit(1);
        }
    };

    let stats = engine.recovery_stats();
    tracing::info!(
        "Store recovered: {} keys from {} events (last sequence {})",
        engine.store().len(),
        stats.events_replayed,
        stats.last_sequence
    );

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
