//! student-records-mcp: MCP server for a student grade book
//!
//! This tool exposes student record queries to AI assistants over stdio or
//! TCP.

use std::fs::OpenOptions;
use std::future::Future;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use student_records_mcp::config::{self, Config, LogTarget, TransportMode};
use student_records_mcp::mcp::{Dispatcher, McpServer};
use student_records_mcp::store::sample;

/// MCP server for a student grade book.
///
/// Serves newline-delimited JSON-RPC over stdin/stdout, or over TCP with one
/// session per connection.
#[derive(Parser, Debug)]
#[command(name = "student-records-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Transport to serve (overrides MCP_MODE and the config file)
    #[arg(long, value_enum)]
    mode: Option<TransportMode>,

    /// TCP port (overrides PORT and the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Insert the sample students if the store is empty
    #[arg(long)]
    seed: bool,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Stdout carries protocol traffic in stdio mode, so it is never a sink.
fn init_tracing(level: Level, cfg: &Config) -> std::io::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    match (cfg.logging.target, cfg.logging.file.as_ref()) {
        (LogTarget::Off, _) => {}
        (LogTarget::File, Some(path)) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        (LogTarget::Stderr | LogTarget::File, _) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

/// How long shutdown waits for blocking-pool work before abandoning it.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Drives `future` to completion, then shuts the runtime down.
///
/// A pending stdin read sits on the blocking pool and cannot be cancelled,
/// so shutdown is bounded instead of waiting for the next input line.
fn run_to_completion<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    output
}

/// Builds the effective configuration: file, then environment, then flags.
fn resolve_config(args: &Args) -> Result<Config, student_records_mcp::error::ConfigError> {
    let mut cfg = config::load_config(args.config.as_deref())?;
    cfg.apply_env(|name| std::env::var(name).ok())?;

    if let Some(mode) = args.mode {
        cfg.server.mode = mode;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Entry point for the student-records-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let cfg = match resolve_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if args.config.is_none() {
                if let Some(default_path) = config::default_config_path().filter(|p| p.exists()) {
                    eprintln!("\nConfig file read from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the format");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    if let Err(e) = init_tracing(log_level, &cfg) {
        eprintln!("Failed to open log file: {e}");
        return ExitCode::FAILURE;
    }

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "student-records-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting student-records-mcp server"
    );

    let addr = match cfg.server.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "Invalid listen address");
            return ExitCode::FAILURE;
        }
    };

    // Open the record store
    let store = match cfg.store.open() {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, uri = %cfg.store.uri, "Failed to open record store");
            return ExitCode::FAILURE;
        }
    };

    info!(
        uri = %cfg.store.uri,
        database = %cfg.store.database,
        collection = %cfg.store.collection,
        "Record store opened"
    );

    if args.seed {
        match sample::seed(store.as_ref()) {
            Ok(0) => info!("Store already populated, skipping sample data"),
            Ok(count) => info!(count, "Inserted sample students"),
            Err(e) => {
                error!(error = %e, "Failed to insert sample students");
                return ExitCode::FAILURE;
            }
        }
    }

    let mode = cfg.server.mode.resolve(std::io::stdin().is_terminal());
    info!(mode = %mode, "Transport selected");

    // Create MCP server
    let server = McpServer::new(Dispatcher::new(store));

    // Run the server
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = run_to_completion(runtime, server.run(mode, addr));

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
