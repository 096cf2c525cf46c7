//! CLI `reset` command: wipe the data moat and long-term memory after confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use moat::config::MoatConfig;

pub fn reset(config: &MoatConfig, yes: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !yes {
        println!("WARNING: This will permanently delete ALL data entries and long-term memories.");
        println!("Database: {}", db_path.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let conn = moat::db::open_database(&db_path)?;
    moat::db::wipe_stores(&conn)?;
    tracing::warn!(db = %db_path.display(), "database reset");

    println!("Database reset complete. The note journal is untouched.");
    Ok(())
}
