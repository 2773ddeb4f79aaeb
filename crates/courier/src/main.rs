//! Courier - routed, queued, batching event delivery
//!
//! # Usage
//!
//! ```bash
//! # Run with a config file
//! courier --config configs/courier.toml
//!
//! # Feed messages from stdin: one "<routing_key> <payload>" per line
//! tail -f app.log | courier --config configs/courier.toml --stdin
//!
//! # Reload routing and sink configuration without restarting
//! kill -HUP $(pidof courier)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use courier_config::Config;
use courier_metrics::StatsReporter;
use courier_pipeline::{Message, Pipeline};
use tokio::io::AsyncBufReadExt;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Courier - routed, queued, batching event delivery
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "configs/courier.toml")]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Read messages from stdin, one "<routing_key> <payload>" per line
    #[arg(long)]
    stdin: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    init_logging(level)?;

    let pipeline = Arc::new(Pipeline::start(&config).context("starting pipeline")?);

    let mut reporter = spawn_reporter(&config, &pipeline);

    if cli.stdin {
        spawn_stdin_ingestion(Arc::clone(&pipeline));
    }

    // SIGHUP reloads; ctrl-c shuts down
    let mut hangup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            _ = hangup.recv() => {
                reload(&cli.config, &pipeline, &config, &mut reporter).await;
            }
        }
    }

    pipeline.shutdown().await;
    stop_reporter(reporter).await;

    Ok(())
}

/// Re-read the config file and swap it in; a bad file leaves the running
/// configuration active
async fn reload(
    path: &PathBuf,
    pipeline: &Arc<Pipeline>,
    startup_config: &Config,
    reporter: &mut Option<(CancellationToken, JoinHandle<()>)>,
) {
    tracing::info!(config = %path.display(), "reload requested");

    let new_config = match Config::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "reload rejected, keeping previous configuration");
            return;
        }
    };

    if let Err(e) = pipeline.reload(&new_config) {
        tracing::error!(error = %e, "reload failed, keeping previous configuration");
        return;
    }

    // The reporter holds handles into the old topology; restart it over the
    // new one. Reporting enablement and interval stay as configured at
    // startup.
    stop_reporter(reporter.take()).await;
    *reporter = spawn_reporter(startup_config, pipeline);
}

/// Start the stats reporter if metrics are enabled
fn spawn_reporter(
    config: &Config,
    pipeline: &Arc<Pipeline>,
) -> Option<(CancellationToken, JoinHandle<()>)> {
    if !config.metrics.enabled {
        return None;
    }

    let mut reporter = StatsReporter::new(config.metrics.interval);
    reporter.set_router(Arc::new(pipeline.router_stats()));
    for handle in pipeline.sink_stats() {
        reporter.add_sink(Arc::new(handle));
    }

    let token = CancellationToken::new();
    let task = tokio::spawn(reporter.run(token.clone()));
    Some((token, task))
}

async fn stop_reporter(reporter: Option<(CancellationToken, JoinHandle<()>)>) {
    if let Some((token, task)) = reporter {
        token.cancel();
        let _ = task.await;
    }
}

/// Read "<routing_key> <payload>" lines from stdin into the router
fn spawn_stdin_ingestion(pipeline: Arc<Pipeline>) {
    tokio::spawn(async move {
        let reader = tokio::io::BufReader::new(tokio::io::stdin());
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            if line.is_empty() {
                continue;
            }
            let (key, payload) = match line.split_once(char::is_whitespace) {
                Some((key, payload)) => (key.to_string(), payload.to_string()),
                None => (line, String::new()),
            };
            pipeline.submit(Message::new(key, payload.into_bytes())).await;
        }

        tracing::info!("stdin ingestion ended");
    });
}

/// Initialize the tracing subscriber
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {e}"))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    Ok(())
}
