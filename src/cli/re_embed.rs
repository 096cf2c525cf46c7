//! CLI `re-embed` command: regenerate all vectors with the configured model.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

use moat::config::MoatConfig;
use moat::db;
use moat::memory::embedding_to_bytes;

const BATCH_SIZE: usize = 32;

pub async fn re_embed(config: &MoatConfig) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path()).context("failed to open database")?;
    let provider = super::embedding_provider(config)?;

    let memories: Vec<(String, String)> = {
        let mut stmt = conn.prepare("SELECT id, content FROM memories ORDER BY created_at")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let total = memories.len();
    if total == 0 {
        println!("No memories to re-embed.");
        return Ok(());
    }

    println!("Re-embedding {total} memories with model '{}'...", config.embedding.model);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    for chunk in memories.chunks(BATCH_SIZE) {
        let texts: Vec<String> = chunk.iter().map(|(_, content)| content.clone()).collect();
        let provider = Arc::clone(&provider);

        let embeddings = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            provider.embed_batch(&refs)
        })
        .await?
        .context("embedding batch failed")?;

        for ((id, _), emb) in chunk.iter().zip(&embeddings) {
            conn.execute("DELETE FROM memories_vec WHERE id = ?1", [id])?;
            conn.execute(
                "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
                rusqlite::params![id, embedding_to_bytes(emb)],
            )?;
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    db::migrations::set_embedding_model(&conn, &config.embedding.model)?;

    println!("Re-embedded {total} memories with model '{}'.", config.embedding.model);
    Ok(())
}
