use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{AchievementCommand, ConfigCommand, NoteCommand, PlanCommand, SyncCommand};
use dailyplan::config::Config;
use dailyplan::sync::SyncCoordinator;

#[derive(Parser)]
#[command(name = "dailyplan")]
#[command(version)]
#[command(about = "An offline-first daily planner", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage daily plans
    Plan(PlanCommand),

    /// Manage achievements
    Achievement(AchievementCommand),

    /// Manage special notes
    Note(NoteCommand),

    /// Sync queued changes with the remote store
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dailyplan=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Plan(cmd)) => {
            let sync = SyncCoordinator::open(&config).await?;
            cmd.run(&sync).await?;
        }
        Some(Commands::Achievement(cmd)) => {
            let sync = SyncCoordinator::open(&config).await?;
            cmd.run(&sync).await?;
        }
        Some(Commands::Note(cmd)) => {
            let sync = SyncCoordinator::open(&config).await?;
            cmd.run(&sync).await?;
        }
        Some(Commands::Sync(cmd)) => {
            let sync = SyncCoordinator::open(&config).await?;
            cmd.run(&sync, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
