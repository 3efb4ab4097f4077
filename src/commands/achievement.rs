use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};

use dailyplan::models::{AchievementStatus, NewAchievement};
use dailyplan::sync::SyncCoordinator;

use super::{find_record, print_pending_hint, sync_marker, truncate, OutputFormat};

#[derive(Args)]
pub struct AchievementCommand {
    #[command(subcommand)]
    pub command: AchievementSubcommand,
}

#[derive(Subcommand)]
pub enum AchievementSubcommand {
    /// List achievements, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show achievements with this status
        #[arg(long)]
        status: Option<AchievementStatus>,
    },

    /// Add an achievement
    Add {
        /// Title
        title: String,

        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Progress in percent (0-100)
        #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=100))]
        progress: u8,

        /// Status (completed, in-progress, planned)
        #[arg(long, default_value = "planned")]
        status: AchievementStatus,
    },

    /// Edit an existing achievement
    Edit {
        /// Achievement ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// New progress in percent (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        progress: Option<u8>,

        /// New status (completed, in-progress, planned)
        #[arg(long)]
        status: Option<AchievementStatus>,
    },
}

impl AchievementCommand {
    pub async fn run(&self, sync: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        let achievements = sync.achievements();

        match &self.command {
            AchievementSubcommand::List { format, status } => {
                let entries: Vec<_> = achievements
                    .get_all()
                    .await
                    .into_iter()
                    .filter(|e| status.map_or(true, |s| e.record.status == s))
                    .collect();

                if entries.is_empty() {
                    println!("No achievements found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "  {:<15}  {:<10}  {:<30}  {:>4}  STATUS",
                            "ID", "DATE", "TITLE", "%"
                        );
                        println!("{}", "-".repeat(80));
                        for entry in &entries {
                            let a = &entry.record;
                            println!(
                                "{} {:<15}  {:<10}  {:<30}  {:>4}  {}",
                                sync_marker(entry),
                                a.id,
                                a.date,
                                truncate(&a.title, 30),
                                a.progress,
                                a.status
                            );
                        }
                        println!("\nTotal: {} achievement(s)", entries.len());
                        print_pending_hint(entries.iter().any(|e| !e.is_reconciled()));
                    }
                }
                Ok(())
            }

            AchievementSubcommand::Add {
                title,
                date,
                progress,
                status,
            } => {
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                let draft = NewAchievement::new(title.trim(), date)
                    .with_progress(*progress)
                    .with_status(*status);

                let created = achievements.create(draft).await?;
                println!("Created achievement:");
                println!("{}", created.record);
                if !created.is_reconciled() {
                    println!("Saved locally; will sync when the server is reachable.");
                }
                Ok(())
            }

            AchievementSubcommand::Edit {
                id,
                title,
                date,
                progress,
                status,
            } => {
                let mut achievement = find_record(achievements.get_all().await, id)?;

                if let Some(title) = title {
                    if title.trim().is_empty() {
                        return Err("Title cannot be empty".into());
                    }
                    achievement.title = title.trim().to_string();
                }
                if let Some(date) = date {
                    achievement.date = *date;
                }
                if let Some(progress) = progress {
                    achievement.progress = *progress;
                }
                if let Some(status) = status {
                    achievement.status = *status;
                }

                achievements.update(achievement.clone()).await?;
                println!("Updated achievement:");
                println!("{}", achievement);
                Ok(())
            }
        }
    }
}
