use anyhow::{bail, Context, Result};
use clap::Subcommand;

use moat::config::MoatConfig;
use moat::data;

#[derive(Subcommand)]
pub enum DataAction {
    /// Store a JSON value under a key (overwrites)
    Put { key: String, value: String },
    /// Print the value stored under a key
    Get { key: String },
    /// List entries whose key contains the given text
    Query { needle: String },
    /// Remove a key
    Remove { key: String },
}

pub fn run(config: &MoatConfig, action: DataAction) -> Result<()> {
    let conn = moat::db::open_database(config.resolved_db_path())?;

    match action {
        DataAction::Put { key, value } => {
            let value: serde_json::Value =
                serde_json::from_str(&value).context("value must be valid JSON")?;
            data::add_data(&conn, &key, &value)?;
            println!("Stored {key}.");
        }
        DataAction::Get { key } => match data::get_data(&conn, &key)? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => bail!("no data stored under {key:?}"),
        },
        DataAction::Query { needle } => {
            let entries = data::query_entries(&conn, &needle)?;
            if entries.is_empty() {
                println!("No matching keys.");
            }
            for entry in entries {
                println!("{}: {}", entry.key, entry.value);
            }
        }
        DataAction::Remove { key } => {
            if !data::remove_data(&conn, &key)? {
                bail!("no data stored under {key:?}");
            }
            println!("Removed {key}.");
        }
    }

    Ok(())
}
