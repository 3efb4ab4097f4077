use clap::ValueEnum;

use dailyplan::models::{Record, Tracked};

mod achievement;
mod config_cmd;
mod note;
mod plan;
mod sync_cmd;

pub use achievement::AchievementCommand;
pub use config_cmd::ConfigCommand;
pub use note::NoteCommand;
pub use plan::PlanCommand;
pub use sync_cmd::SyncCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Looks up a listed record by id, cloning it out for editing.
fn find_record<T: Record>(records: Vec<Tracked<T>>, id: &str) -> Result<T, String> {
    records
        .into_iter()
        .map(|entry| entry.record)
        .find(|record| record.id() == id)
        .ok_or_else(|| format!("No record found with ID '{}'", id))
}

/// Marker shown next to records the remote store has not confirmed yet.
fn sync_marker<T>(entry: &Tracked<T>) -> &'static str {
    if entry.is_reconciled() {
        " "
    } else {
        "*"
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let cut: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

fn print_pending_hint(any_pending: bool) {
    if any_pending {
        println!("(* = not yet synced)");
    }
}
