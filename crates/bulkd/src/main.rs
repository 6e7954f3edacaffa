//! bulkd - Bulk command aggregator server
//!
//! # Usage
//!
//! ```bash
//! # Accept clients on port 9000, coalescing singletons three at a time
//! bulkd 9000 3
//!
//! # Keep the bulk files out of the working directory
//! bulkd 9000 3 --output-dir /var/log/bulkd
//! ```
//!
//! Clients stream newline-delimited commands; `{` / `}` lines bracket
//! blocks that reach the sinks as one bulk. SIGINT or SIGTERM stops
//! accepting, drains the pipeline, and dumps the final counters.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bulkd_metrics::Registry;
use bulkd_server::{Server, ServerConfig};

/// Bulk command aggregator server
#[derive(Parser, Debug)]
#[command(name = "bulkd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TCP port to listen on
    port: u16,

    /// Singleton commands per coalesced bulk (0 = no size cap)
    bulk_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory for the per-bulk log files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;

    let registry = Arc::new(Registry::new());
    let config = ServerConfig::default()
        .with_port(cli.port)
        .with_bulk_size(cli.bulk_size)
        .with_output_dir(cli.output_dir);

    let server = Server::bind(config, registry.clone()).context("server startup failed")?;
    server.run(shutdown)?;

    for line in registry.render().lines() {
        tracing::info!("{}", line);
    }

    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
