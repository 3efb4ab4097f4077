//! Sync CLI commands for replaying queued changes.

use clap::{Args, Subcommand};

use dailyplan::config::Config;
use dailyplan::sync::SyncCoordinator;

/// Sync with the remote store
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show connectivity, queued changes and last sync time
    Status,
}

impl SyncCommand {
    pub async fn run(
        &self,
        sync: &SyncCoordinator,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(sync, config).await,
            Some(SyncSubcommand::Status) => self.status(sync, config).await,
        }
    }

    async fn sync(
        &self,
        sync: &SyncCoordinator,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !config.remote.is_configured() {
            return Err("Remote store not configured. Run `dailyplan sync status` for setup.".into());
        }

        let queued = sync.pending_operations().await?.len();
        println!("Syncing {} queued change(s)...", queued);

        if !sync.sync_now().await {
            return Err("Remote store unreachable; changes stay queued.".into());
        }

        let remaining = sync.pending_operations().await?.len();
        if remaining == 0 {
            println!("Sync complete.");
        } else {
            println!(
                "Synced {} change(s); {} still queued (rejected by the server).",
                queued.saturating_sub(remaining),
                remaining
            );
        }
        Ok(())
    }

    async fn status(
        &self,
        sync: &SyncCoordinator,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Status");
        println!("===========");
        println!();

        match &config.remote.url {
            Some(url) if config.remote.is_configured() => {
                println!("Server:    {}", url);
                let reachable = sync.is_reachable().await;
                println!(
                    "Status:    {}",
                    if reachable { "✓ reachable" } else { "✗ unreachable" }
                );
            }
            _ => {
                println!("Server:    not configured");
                println!();
                println!("To enable sync, add to your config file:");
                println!();
                println!("  remote:");
                println!("    url: \"http://localhost:8080\"");
                println!("    api_key: \"your-api-key\"");
                println!();
                println!("Or set environment variables:");
                println!("  DAILYPLAN_REMOTE_URL");
                println!("  DAILYPLAN_REMOTE_API_KEY");
            }
        }
        println!();

        match sync.last_sync().await? {
            Some(at) => println!("Last sync: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("Last sync: never"),
        }

        let pending = sync.pending_operations().await?;
        println!("Queued:    {} change(s)", pending.len());
        for op in &pending {
            println!(
                "  {} {:<6} {:<14} {}",
                op.enqueued_at.format("%Y-%m-%d %H:%M"),
                op.kind,
                op.table,
                op.record_id().unwrap_or("?")
            );
        }

        Ok(())
    }
}
