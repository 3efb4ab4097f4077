use clap::{Args, Subcommand};
use std::io::{self, Write};

use dailyplan::models::NewSpecialNote;
use dailyplan::sync::SyncCoordinator;

use super::{find_record, print_pending_hint, sync_marker, truncate, OutputFormat};

#[derive(Args)]
pub struct NoteCommand {
    #[command(subcommand)]
    pub command: NoteSubcommand,
}

#[derive(Subcommand)]
pub enum NoteSubcommand {
    /// List special notes, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a note
    Add {
        /// Note text
        content: String,
    },

    /// Replace the text of a note
    Edit {
        /// Note ID
        id: String,

        /// New text
        content: String,
    },

    /// Delete a note
    Delete {
        /// Note ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl NoteCommand {
    pub async fn run(&self, sync: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        let notes = sync.notes();

        match &self.command {
            NoteSubcommand::List { format } => {
                let entries = notes.get_all().await;
                if entries.is_empty() {
                    println!("No notes found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        println!("  {:<15}  {:<16}  CONTENT", "ID", "CREATED");
                        println!("{}", "-".repeat(80));
                        for entry in &entries {
                            let note = &entry.record;
                            println!(
                                "{} {:<15}  {:<16}  {}",
                                sync_marker(entry),
                                note.id,
                                note.created_at.format("%Y-%m-%d %H:%M"),
                                truncate(note.content.lines().next().unwrap_or(""), 40)
                            );
                        }
                        println!("\nTotal: {} note(s)", entries.len());
                        print_pending_hint(entries.iter().any(|e| !e.is_reconciled()));
                    }
                }
                Ok(())
            }

            NoteSubcommand::Add { content } => {
                let created = notes.create(NewSpecialNote::new(content.as_str())).await?;
                println!("Created note {}", created.record.id);
                if !created.is_reconciled() {
                    println!("Saved locally; will sync when the server is reachable.");
                }
                Ok(())
            }

            NoteSubcommand::Edit { id, content } => {
                if content.trim().is_empty() {
                    return Err("A note cannot be empty".into());
                }
                let mut note = find_record(notes.get_all().await, id)?;
                note.content = content.clone();

                notes.update(note).await?;
                println!("Updated note {}", id);
                Ok(())
            }

            NoteSubcommand::Delete { id, force } => {
                let note = find_record(notes.get_all().await, id)?;

                if !force {
                    print!(
                        "Delete note \"{}\"? [y/N] ",
                        truncate(note.content.lines().next().unwrap_or(""), 40)
                    );
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Cancelled");
                        return Ok(());
                    }
                }

                notes.delete(id).await?;
                println!("Deleted note {}", id);
                Ok(())
            }
        }
    }
}
