//! `moat notes`: the note journal from the terminal.
//!
//! Every subcommand loads the journal file, applies one change and saves it
//! back when something changed.

use anyhow::{bail, Result};
use chrono::Local;
use clap::Subcommand;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use moat::memory::journal::{export_file_name, parse_tags, Filter, Journal};
use moat::memory::types::{Category, Importance, MemoryRecord};

#[derive(Subcommand)]
pub enum NotesAction {
    /// Add a new note
    Add {
        content: String,
        #[arg(short, long, default_value = "Knowledge")]
        category: Category,
        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
    },
    /// List notes, newest first
    List {
        /// Keyword to search for in content, category and tags
        query: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Importance levels to include (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        importance: Vec<Importance>,
        /// Print raw JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Delete a note by id
    Delete { id: u64 },
    /// Delete every note
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Append the notes from a JSON export
    Import { file: PathBuf },
    /// Write all notes to a JSON file (`-` for stdout)
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show totals per category
    Stats,
}

pub fn run(journal_path: &Path, action: NotesAction) -> Result<()> {
    let mut journal = Journal::load(journal_path)?;

    match action {
        NotesAction::Add {
            content,
            category,
            tags,
        } => {
            let record = journal.add(&content, category, parse_tags(&tags))?;
            journal.save(journal_path)?;
            println!("Memory added successfully!");
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        NotesAction::List {
            query,
            category,
            importance,
            json,
        } => {
            let filter = Filter {
                category,
                importance: importance.into_iter().collect::<HashSet<_>>(),
                query,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&journal.filter(&filter))?);
            } else {
                print_listing(&journal.listing(&filter));
            }
        }
        NotesAction::Delete { id } => {
            if !journal.delete(id) {
                bail!("no memory with id {id}");
            }
            journal.save(journal_path)?;
            println!("Deleted memory #{id}.");
        }
        NotesAction::Clear { yes } => {
            if !yes {
                bail!("refusing to clear {} memories without --yes", journal.len());
            }
            journal.clear();
            journal.save(journal_path)?;
            println!("All memories cleared!");
        }
        NotesAction::Import { file } => {
            let n = journal.import_file(&file)?;
            journal.save(journal_path)?;
            println!("Imported {n} memories!");
        }
        NotesAction::Export { output } => {
            let json = journal.to_json()?;
            match output {
                Some(path) if path.as_os_str() == "-" => println!("{json}"),
                output => {
                    let path =
                        output.unwrap_or_else(|| PathBuf::from(export_file_name(&Local::now())));
                    std::fs::write(&path, json)?;
                    println!("Exported {} memories to {}", journal.len(), path.display());
                }
            }
        }
        NotesAction::Stats => {
            println!("Total memories: {}", journal.len());
            let counts = journal.category_counts();
            if !counts.is_empty() {
                println!();
                println!("By category:");
                for (category, count) in counts {
                    println!("  • {category}: {count}");
                }
            }
        }
    }

    Ok(())
}

fn print_listing(hits: &[&MemoryRecord]) {
    if hits.is_empty() {
        println!("No memories found. Add some memories to get started!");
        return;
    }
    println!("Showing {} memories\n", hits.len());
    for m in hits {
        println!("Memory #{} - {} - {}", m.id, m.category, m.date());
        println!("  Content:    {}", m.content);
        println!("  Tags:       {}", m.tags.join(", "));
        println!("  Timestamp:  {}", m.timestamp);
        println!("  Importance: {}", m.importance_label());
        println!();
    }
}
