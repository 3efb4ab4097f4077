use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};

use dailyplan::models::NewDailyPlan;
use dailyplan::sync::SyncCoordinator;

use super::{find_record, print_pending_hint, sync_marker, truncate, OutputFormat};

#[derive(Args)]
pub struct PlanCommand {
    #[command(subcommand)]
    pub command: PlanSubcommand,
}

#[derive(Subcommand)]
pub enum PlanSubcommand {
    /// List daily plans, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a daily plan
    Add {
        /// Day label (e.g. "Monday")
        day: String,

        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Targets for the day
        #[arg(long)]
        targets: Option<String>,
    },

    /// Edit an existing daily plan
    Edit {
        /// Plan ID
        id: String,

        /// New day label
        #[arg(long)]
        day: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,

        /// New targets
        #[arg(long)]
        targets: Option<String>,
    },
}

impl PlanCommand {
    pub async fn run(&self, sync: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        let plans = sync.plans();

        match &self.command {
            PlanSubcommand::List { format } => {
                let entries = plans.get_all().await;
                if entries.is_empty() {
                    println!("No daily plans found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        println!("  {:<15}  {:<10}  {:<12}  TARGETS", "ID", "DATE", "DAY");
                        println!("{}", "-".repeat(80));
                        for entry in &entries {
                            let plan = &entry.record;
                            println!(
                                "{} {:<15}  {:<10}  {:<12}  {}",
                                sync_marker(entry),
                                plan.id,
                                plan.date,
                                truncate(&plan.day, 12),
                                truncate(plan.targets.lines().next().unwrap_or(""), 35)
                            );
                        }
                        println!("\nTotal: {} plan(s)", entries.len());
                        print_pending_hint(entries.iter().any(|e| !e.is_reconciled()));
                    }
                }
                Ok(())
            }

            PlanSubcommand::Add {
                day,
                date,
                notes,
                targets,
            } => {
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                let mut draft = NewDailyPlan::new(day.trim(), date);
                if let Some(notes) = notes {
                    draft = draft.with_notes(notes.as_str());
                }
                if let Some(targets) = targets {
                    draft = draft.with_targets(targets.as_str());
                }

                let created = plans.create(draft).await?;
                println!("Created daily plan:");
                println!("{}", created.record);
                if !created.is_reconciled() {
                    println!("Saved locally; will sync when the server is reachable.");
                }
                Ok(())
            }

            PlanSubcommand::Edit {
                id,
                day,
                date,
                notes,
                targets,
            } => {
                let mut plan = find_record(plans.get_all().await, id)?;

                if let Some(day) = day {
                    if day.trim().is_empty() {
                        return Err("Day cannot be empty".into());
                    }
                    plan.day = day.trim().to_string();
                }
                if let Some(date) = date {
                    plan.date = *date;
                }
                if let Some(notes) = notes {
                    plan.notes = notes.clone();
                }
                if let Some(targets) = targets {
                    plan.targets = targets.clone();
                }

                plans.update(plan.clone()).await?;
                println!("Updated daily plan:");
                println!("{}", plan);
                Ok(())
            }
        }
    }
}
