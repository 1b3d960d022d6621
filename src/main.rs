use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use skytrack::config::TrackerConfig;
use skytrack::telemetry;

mod commands;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(name = "skytrack")]
#[command(version, about = "Points a pan/tilt mount at the nearest aircraft from an ADS-B feed")]
struct Cli {
    /// Config file (default: $SKYTRACK_CONFIG or ./skytrack.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track aircraft and serve the dashboard
    Run,
    /// Poll the feed once and show what would be tracked
    Scan,
    /// Send one pointing command to the mount
    Point {
        /// Pan angle in degrees, clamped to the mount's travel
        #[arg(long, allow_negative_numbers = true)]
        pan: f64,
        /// Tilt angle in degrees, clamped to the mount's travel
        #[arg(long, allow_negative_numbers = true)]
        tilt: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let sentry_guard = telemetry::init_sentry();
    telemetry::init_tracing(sentry_guard.is_some());

    let cli = Cli::parse();
    let config = TrackerConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => commands::handle_run(config).await,
        Commands::Scan => commands::handle_scan(config).await,
        Commands::Point { pan, tilt } => commands::handle_point(config, pan, tilt).await,
    }
}
