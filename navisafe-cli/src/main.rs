//! NaviSafe CLI
//!
//! Geofenced tourist safety tracking with emergency escalation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use navisafe_broadcast::Broadcaster;
use navisafe_core::{score, NavisafeConfig, Position, ZoneCatalog};
use navisafe_runtime::{TrackerHandle, TrackerRegistry, TrackerSnapshot};
use navisafe_sources::{
    PositionSource, ReplaySource, SimulatedFailure, SimulatedSensor, SimulatedSensorConfig,
};

#[derive(Parser)]
#[command(name = "navisafe")]
#[command(author, version, about = "NaviSafe: geofenced tourist safety tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, env = "NAVISAFE_CONFIG")]
    config: Option<PathBuf>,

    /// Subject (tourist) id
    #[arg(short, long, default_value = "tourist-001")]
    subject: String,

    /// Webhook base URL for event broadcast (overrides config)
    #[arg(long, env = "NAVISAFE_WEBHOOK")]
    webhook: Option<String>,

    /// Emergency countdown in seconds (overrides config)
    #[arg(long)]
    countdown: Option<u32>,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List the zone catalog
    Zones,

    /// Score a single coordinate
    Score {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },

    /// Track a simulated sensor walk
    Simulate {
        /// How long to run in seconds
        #[arg(long, default_value = "30")]
        seconds: u64,

        /// Starting latitude (default: Central Safe Zone)
        #[arg(long, allow_hyphen_values = true)]
        start_lat: Option<f64>,

        /// Starting longitude (default: Central Safe Zone)
        #[arg(long, allow_hyphen_values = true)]
        start_lng: Option<f64>,

        /// Maximum step per sample in meters
        #[arg(long, default_value = "40")]
        step: f64,

        /// Seed for a reproducible walk
        #[arg(long)]
        seed: Option<u64>,

        /// Simulate a sensor that never gets a fix
        #[arg(long)]
        no_fix: bool,

        /// Simulate denied location permission
        #[arg(long)]
        deny: bool,
    },

    /// Track positions replayed from a JSON-lines file
    Replay {
        #[arg(short, long)]
        file: PathBuf,

        /// Interval between samples in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Seconds to keep running after the last sample
        #[arg(long, default_value = "6")]
        linger: u64,
    },

    /// Drive a tracker from stdin: `lat,lng`, `dismiss`, `status`, `quit`
    Manual,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => NavisafeConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NavisafeConfig::default(),
    };
    if let Some(url) = cli.webhook.clone() {
        config.broadcast.webhook_url = Some(url);
    }
    if let Some(countdown) = cli.countdown {
        config.tracking.countdown_secs = countdown;
    }

    let catalog = config.catalog().context("building zone catalog")?;

    match cli.command {
        Commands::Zones => list_zones(&catalog),
        Commands::Score { lat, lng } => score_point(&config, &catalog, lat, lng)?,
        Commands::Simulate {
            seconds,
            start_lat,
            start_lng,
            step,
            seed,
            no_fix,
            deny,
        } => {
            let mut sensor = SimulatedSensorConfig::default()
                .with_interval(Duration::from_millis(config.sensor.interval_ms))
                .with_step(step);
            sensor.timeout_ms = config.sensor.timeout_ms;
            if let (Some(lat), Some(lng)) = (start_lat, start_lng) {
                sensor = sensor.with_start(lat, lng);
            }
            if let Some(seed) = seed {
                sensor = sensor.with_seed(seed);
            }
            if deny {
                sensor = sensor.with_failure(SimulatedFailure::PermissionDenied);
            } else if no_fix {
                sensor = sensor.with_failure(SimulatedFailure::NoFix);
            }

            println!("🛰️  Simulated sensor walk for {}s\n", seconds);
            let source: Box<dyn PositionSource> = Box::new(SimulatedSensor::new(sensor));
            run_session(&cli.subject, config, catalog, Some(source), seconds).await?;
        }
        Commands::Replay {
            file,
            interval_ms,
            linger,
        } => {
            let source = ReplaySource::from_file(&file, Duration::from_millis(interval_ms))
                .with_context(|| format!("reading {}", file.display()))?;
            let seconds = (source.len() as u64 * interval_ms).div_ceil(1000) + linger;

            println!("📼 Replaying {} positions from {}\n", source.len(), file.display());
            run_session(&cli.subject, config, catalog, Some(Box::new(source)), seconds).await?;
        }
        Commands::Manual => run_manual(&cli.subject, config, catalog).await?,
    }

    Ok(())
}

fn list_zones(catalog: &ZoneCatalog) {
    println!("🗺️  {} zones\n", catalog.len());
    for zone in catalog.iter() {
        println!(
            "  {:<11} {:<28} ({:.4}, {:.4}) r={}m  [{}]",
            zone.kind.as_str(),
            zone.name,
            zone.lat,
            zone.lng,
            zone.radius_m,
            zone.id
        );
    }
}

fn score_point(config: &NavisafeConfig, catalog: &ZoneCatalog, lat: f64, lng: f64) -> Result<()> {
    let position = Position::new(lat, lng, None)?;
    let safety = score(&position, catalog, &config.tracking.thresholds);

    println!("📍 {:.6}, {:.6}", position.lat, position.lng);
    println!("🛡️  Safety score: {}", safety);

    let zones: Vec<_> = catalog.containing(&position).collect();
    if zones.is_empty() {
        println!("   Outside all zones");
    }
    for zone in zones {
        println!("   in {} ({})", zone.name, zone.kind);
    }
    Ok(())
}

/// Run one tracker against a sensor source for a fixed time (or until
/// Ctrl-C), then print a summary
async fn run_session(
    subject: &str,
    config: NavisafeConfig,
    catalog: ZoneCatalog,
    source: Option<Box<dyn PositionSource>>,
    seconds: u64,
) -> Result<()> {
    let broadcaster = Broadcaster::from_config(&config.broadcast)?.spawn();
    let registry = TrackerRegistry::new(config, Arc::new(catalog), broadcaster.publisher());
    registry.spawn(subject, source)?;

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => println!("\n⏹️  Interrupted"),
    }

    for snapshot in registry.stop_all().await {
        print_summary(&snapshot);
    }

    let stats = broadcaster.shutdown().await;
    println!(
        "\n📡 Events: {} sent, {} dropped, {} sink failures",
        stats.queue.accepted, stats.queue.dropped, stats.failures
    );
    Ok(())
}

async fn run_manual(subject: &str, config: NavisafeConfig, catalog: ZoneCatalog) -> Result<()> {
    let broadcaster = Broadcaster::from_config(&config.broadcast)?.spawn();
    let registry = TrackerRegistry::new(config, Arc::new(catalog), broadcaster.publisher());
    let handle = registry.spawn(subject, None)?;

    println!("✍️  Manual mode for {}", subject);
    println!("   Enter `lat,lng`, `dismiss`, `status` or `quit`\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "dismiss" => match handle.dismiss().await? {
                true => println!("✅ Emergency alert dismissed"),
                false => println!("   No active alert"),
            },
            "status" => print_status(&handle).await?,
            _ => match parse_coordinate(line) {
                Some((lat, lng)) => match handle.inject(lat, lng).await {
                    Ok(safety) => {
                        println!("🛡️  Safety score: {}", safety);
                        print_status(&handle).await?;
                    }
                    Err(e) => println!("⚠️  {}", e),
                },
                None => println!("⚠️  Expected `lat,lng`, got `{}`", line),
            },
        }
    }

    for snapshot in registry.stop_all().await {
        print_summary(&snapshot);
    }
    broadcaster.shutdown().await;
    Ok(())
}

fn parse_coordinate(line: &str) -> Option<(f64, f64)> {
    let (lat, lng) = line.split_once(',')?;
    Some((lat.trim().parse().ok()?, lng.trim().parse().ok()?))
}

async fn print_status(handle: &TrackerHandle) -> Result<()> {
    let snapshot = handle.snapshot().await?;
    if snapshot.emergency_alert.active {
        println!(
            "🚨 EMERGENCY: {} - calling authorities in {}s (type `dismiss`)",
            snapshot.emergency_alert.zone_name, snapshot.emergency_alert.countdown_seconds
        );
    }
    if !snapshot.zones.is_empty() {
        println!("   Zones: {}", snapshot.zones.join(", "));
    }
    Ok(())
}

fn print_summary(snapshot: &TrackerSnapshot) {
    println!("\n📊 {}", snapshot.subject_id);
    println!("   Manual mode: {}", snapshot.manual_mode);
    println!("   Permission: {:?}", snapshot.permission);
    println!("   Escalations: {}", snapshot.escalation_count);
    if let Some(error) = &snapshot.error {
        println!("   Last error: {}", error);
    }
    if let Ok(json) = serde_json::to_string_pretty(snapshot) {
        tracing::debug!("Final snapshot: {}", json);
    }
}
