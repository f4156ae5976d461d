//! uuiperf Binary Entry Point
//!
//! Samples DNS and ping latency once per interval and appends the results
//! to a CSV file. Core functionality is provided by the `uuiperf` library.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuiperf::{
    collector::dns::{DnsAggregator, HickoryProber},
    collector::ping::PingAggregator,
    config::{AppConfig, Overrides, parse_level},
    orchestrator::Orchestrator,
    shutdown::ShutdownCoordinator,
    storage::{CsvSink, MetricsSink},
};

/// uuiperf - Internet latency sampler
#[derive(Parser, Debug)]
#[command(name = "uuiperf", version, about, long_about = None)]
struct Cli {
    /// Log level: TRACE, DEBUG, INFO, WARNING, ERROR or 10-50 [default: INFO]
    #[arg(short, long, env = "UUIPERF_LEVEL")]
    level: Option<String>,

    /// Seconds between cycles [default: 1.0]
    #[arg(short, long, env = "UUIPERF_INTERVAL")]
    interval: Option<f64>,

    /// CSV output path [default: uuiperf.csv]
    #[arg(short = 'p', long, env = "UUIPERF_CSVPATH")]
    csvpath: Option<PathBuf>,

    /// Path to an optional YAML configuration file
    #[arg(short, long, env = "UUIPERF_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Built-in defaults < config file < ENV < CLI
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.apply_overrides(Overrides {
        level: cli.level,
        interval: cli.interval,
        csvpath: cli.csvpath,
    });
    config.validate()?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let level = parse_level(&config.level)?;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let started_at = Local::now();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %started_at.format("%Y-%m-%d %H:%M:%S"),
        "uuiperf - Internet latency sampler"
    );
    if let Some(path) = &cli.config {
        tracing::info!("Loaded configuration from: {}", path.display());
    }

    let interval = config.interval_duration()?;
    tracing::info!(
        csvpath = %config.csvpath.display(),
        interval = ?interval,
        "CSV file will grow by about {:.1} KiB per day",
        config.csv_kib_per_day()
    );

    let sink = Arc::new(CsvSink::new(&config.csvpath));
    sink.initialize()?;

    let prober = HickoryProber::from_system_conf(&config.dns);
    let dns = DnsAggregator::new(config.dns.clone(), Arc::new(prober));
    let ping = PingAggregator::from_config(config.ping.clone());
    tracing::info!(
        providers = config.dns.providers.len(),
        hosts = config.ping.hosts.len(),
        ping_method = ?config.ping.method,
        "Collectors ready"
    );

    let coordinator = ShutdownCoordinator::new();
    let listener = coordinator.install()?;
    tracing::info!("Press Ctrl+C to shutdown");

    let summary = Orchestrator::new(dns, ping, sink, coordinator.signal())
        .with_interval(interval)
        .with_backoff(config.restart.backoff())
        .run()
        .await;

    listener.abort();

    let uptime = Local::now().signed_duration_since(started_at);
    tracing::info!(
        cycles = summary.cycles_completed,
        failures = summary.cycle_failures,
        uptime = %format_uptime(uptime),
        "uuiperf stopped"
    );
    Ok(())
}

/// Render a wall-clock span as `HH:MM:SS`, with a day count when needed.
fn format_uptime(uptime: chrono::TimeDelta) -> String {
    let total = uptime.num_seconds().max(0);
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, minutes, seconds) = (rest / 3600, rest % 3600 / 60, rest % 60);
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
