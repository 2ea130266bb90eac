use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod platform;

#[derive(Parser)]
#[command(name = "miqat-cli", version, about = "Miqat prayer times CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the adjusted prayer times for a day
    Times {
        /// Date as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the next prayer and the time remaining
    Next {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the live countdown and alarms until interrupted
    Watch {
        /// Print every event as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Per-prayer minute adjustments
    Adjust {
        #[command(subcommand)]
        action: commands::adjust::AdjustAction,
    },
    /// Prayer alarms
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
    /// Location used for prayer times
    Location {
        #[command(subcommand)]
        action: commands::location::LocationAction,
    },
    /// Signed-in user
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("MIQAT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Times { date, json } => commands::times::times(date, json).await,
        Commands::Next { json } => commands::times::next(json).await,
        Commands::Watch { json } => commands::times::watch(json).await,
        Commands::Adjust { action } => commands::adjust::run(action),
        Commands::Alarm { action } => commands::alarm::run(action),
        Commands::Location { action } => commands::location::run(action).await,
        Commands::Session { action } => commands::session::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
