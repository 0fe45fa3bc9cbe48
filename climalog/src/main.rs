//! climalog - weather sample collector
//!
//! Periodically samples temperature and humidity for the Brazilian state
//! capitals and delivers each record either to the backend ingestion endpoint
//! (`direct`) or to a durable RabbitMQ queue (`rabbit`).
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/climalog/config.toml (~/.config/climalog/config.toml)
//! - Logs: $XDG_STATE_HOME/climalog/climalog.log (~/.local/state/climalog/climalog.log)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use climalog_core::config::{redact_url, running_in_container};
use climalog_core::{
    CollectionLoop, Config, DeliveryMode, Dispatcher, OpenMeteoFetcher, QueueStrategy,
    ShutdownSignal,
};

#[derive(Parser)]
#[command(name = "climalog")]
#[command(about = "Collect weather samples and deliver them over HTTP or RabbitMQ")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/climalog/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the collection loop
    Run {
        /// Delivery mode: direct or rabbit (overrides config and COLLECTOR_MODE)
        #[arg(short, long)]
        mode: Option<String>,

        /// Seconds between cycles (overrides config and COLLECT_INTERVAL)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Show the effective configuration
    Status,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let mut config =
        Config::load(args.config.as_deref()).context("failed to load configuration")?;

    match args.command {
        Command::Status => {
            // Logging only when asked for, so the report stays readable
            let _log_guard = if args.verbose {
                Some(
                    climalog_core::logging::init(&config.logging)
                        .context("failed to initialize logging")?,
                )
            } else {
                None
            };
            log_config_source(args.config.as_deref());
            config.fix_endpoints(running_in_container());
            cmd_status(&config)
        }
        Command::Run {
            mode,
            interval,
            once,
        } => {
            if let Some(mode) = mode {
                config.mode = mode.parse().context("invalid --mode")?;
            }
            if let Some(interval) = interval {
                config.interval_secs = interval;
            }
            if args.verbose {
                config.logging.level = "debug".to_string();
            }
            cmd_run(config, args.config.as_deref(), once)
        }
    }
}

fn log_config_source(explicit: Option<&Path>) {
    match Config::resolve_path(explicit) {
        Some(path) => tracing::info!(path = %path.display(), "Loaded configuration"),
        None => tracing::info!(
            path = %Config::config_path().display(),
            "No config file found, using defaults"
        ),
    }
}

fn cmd_run(mut config: Config, explicit: Option<&Path>, once: bool) -> Result<()> {
    let _log_guard =
        climalog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    log_config_source(explicit);
    config.fix_endpoints(running_in_container());
    config.validate().context("invalid configuration")?;

    tracing::info!(
        mode = %config.mode,
        interval_secs = config.interval_secs,
        "climalog starting"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;

    runtime.block_on(run_collector(config, once))
}

async fn run_collector(config: Config, once: bool) -> Result<()> {
    let mut dispatcher =
        Dispatcher::from_config(&config).context("failed to create delivery transport")?;

    if let Err(e) = dispatcher.prepare().await {
        tracing::error!(
            kind = %e.kind(),
            error = %e,
            "Could not connect to message broker, exiting"
        );
        return Err(e).context("failed to connect to message broker");
    }

    // Set up signal handler for graceful shutdown
    let shutdown = ShutdownSignal::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        signal.trigger();
    })
    .context("failed to set Ctrl+C handler")?;

    let fetcher = OpenMeteoFetcher::new(&config.fetch).context("failed to create fetcher")?;

    let send_spacing = match config.mode {
        DeliveryMode::Direct => config.direct.request_spacing(),
        DeliveryMode::Rabbit => Duration::ZERO,
    };

    let mut collection = CollectionLoop::new(
        fetcher,
        dispatcher,
        config.locations(),
        config.interval(),
        shutdown,
    )
    .with_spacing(config.fetch.request_spacing(), send_spacing);

    if once {
        let report = collection.run_once().await;
        println!(
            "Delivered {}/{} records",
            report.success_count(),
            report.attempted()
        );
        for city in report.failed_cities() {
            println!("  Failed: {}", city);
        }
    } else {
        collection.run().await;
    }

    tracing::info!("climalog stopped");
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("climalog Configuration");
    println!("======================");
    println!();

    println!("Config file:     {}", Config::config_path().display());
    println!("Mode:            {}", config.mode);
    println!("Interval:        {}s", config.interval_secs);
    println!();

    match config.mode {
        DeliveryMode::Direct => {
            println!("Backend URL:     {}", redact_url(&config.direct.backend_url));
            println!("Timeout:         {}s", config.direct.timeout_secs);
            println!("Request spacing: {}ms", config.direct.request_spacing_ms);
        }
        DeliveryMode::Rabbit => {
            println!("Queue URL:       {}", redact_url(&config.queue.url));
            println!("Topic:           {}", config.queue.topic);
            println!("Strategy:        {}", config.queue.strategy.as_str());
            if config.queue.strategy == QueueStrategy::PerMessage {
                println!(
                    "Retry:           {} attempts, {}s initial backoff",
                    config.queue.max_attempts, config.queue.initial_backoff_secs
                );
            }
        }
    }
    println!();

    println!("Weather source:  {}", config.fetch.base_url);
    println!(
        "API key:         {}",
        if config.fetch.api_key.is_some() {
            "set"
        } else {
            "not set (mock data)"
        }
    );
    println!("Locations:       {}", config.locations().len());
    println!();

    match config.validate() {
        Ok(()) => {
            println!("Configuration: valid");
            Ok(())
        }
        Err(e) => {
            println!("Configuration: invalid ({})", e);
            Err(e).context("invalid configuration")
        }
    }
}
