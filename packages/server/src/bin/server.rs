//! Multi-client TCP chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tcpchat
//! cargo run --bin tcpchat -- 2525 --capacity 20 --history-dump-secs 60
//! ```
//!
//! Then connect with `nc localhost 8989`.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, error::ErrorKind};
use tcpchat_server::{
    ChatServer, ServerConfig,
    config::{
        DEFAULT_HOST, DEFAULT_LOG_DIR, DEFAULT_OUTBOX_CAPACITY, DEFAULT_PORT, DEFAULT_WRITE_TIMEOUT,
    },
    infrastructure::{FileEventLog, HistoryDump, registry::DEFAULT_CAPACITY},
    ui::{protocol::LOGO, shutdown_signal},
};
use tcpchat_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

const USAGE: &str = "[USAGE]: ./TCPChat $port";
const EVENT_LOG_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "tcpchat")]
#[command(about = "Line-based multi-client TCP chat server", long_about = None)]
struct Args {
    /// Port number to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Maximum number of participants
    #[arg(short = 'c', long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Directory for the event log and chat history files
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    /// Dump the chat history every N seconds (0 dumps only at shutdown)
    #[arg(long, default_value_t = 0)]
    history_dump_secs: u64,

    /// Seconds a single write to a client may take before it is dropped
    #[arg(long, default_value_t = DEFAULT_WRITE_TIMEOUT.as_secs())]
    write_timeout_secs: u64,

    /// Queued outbound lines per client before it is dropped as too slow
    #[arg(long, default_value_t = DEFAULT_OUTBOX_CAPACITY)]
    outbox_capacity: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            capacity: args.capacity,
            outbox_capacity: args.outbox_capacity.max(1),
            write_timeout: Duration::from_secs(args.write_timeout_secs.max(1)),
            log_dir: args.log_dir,
            history_dump_interval: (args.history_dump_secs > 0)
                .then(|| Duration::from_secs(args.history_dump_secs)),
            ..ServerConfig::default()
        }
    }
}

/// Anything but `--help` / `--version` is answered with the usage line
fn is_usage_error(e: &clap::Error) -> bool {
    !matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !is_usage_error(&e) => e.exit(),
        Err(_) => {
            println!("{USAGE}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let config = ServerConfig::from(args);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (events, event_writer) = match FileEventLog::create(&config.log_dir, clock.clone()) {
        Ok(created) => created,
        Err(e) => {
            tracing::error!(
                "Failed to create event log in {}: {}",
                config.log_dir.display(),
                e
            );
            std::process::exit(1);
        }
    };
    tracing::info!("Writing events to {}", events.path().display());

    let dump = Arc::new(HistoryDump::new(&config.log_dir, clock.clone()));
    let dump_interval = config.history_dump_interval;

    let server = match ChatServer::bind(config, Arc::new(events), clock).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            std::process::exit(1);
        }
    };
    let history = server.history();

    let periodic = dump_interval.map(|every| {
        tracing::info!("Dumping chat history every {:?}", every);
        dump.clone()
            .spawn_periodic(history.clone(), every, server.shutdown_token())
    });

    println!("{LOGO}");
    tracing::info!("Press 'q' and Enter, or Ctrl+C, to shutdown gracefully");

    if let Err(e) = server.run(shutdown_signal()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Some(periodic) = periodic {
        if let Err(e) = periodic.await {
            tracing::warn!("History dump task failed: {}", e);
        }
    }
    match dump.write(&history, true).await {
        Ok(()) => tracing::info!("Chat history saved to {}", dump.path().display()),
        Err(e) => {
            tracing::error!("Failed to save chat history to {}: {}", dump.path().display(), e);
            std::process::exit(1);
        }
    }

    // The server's state, and with it the event log, is gone once `run` returns.
    match tokio::time::timeout(EVENT_LOG_FLUSH_TIMEOUT, event_writer).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Event log writer failed: {}", e),
        Err(_) => tracing::warn!("Timed out flushing the event log"),
    }
}
