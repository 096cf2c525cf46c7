//! Long-term memory: text plus an embedding, recalled by vector similarity.
//!
//! Text and metadata live in `memories`; vectors live in the sqlite-vec
//! `memories_vec` table under the same id. Both rows are written in one
//! transaction.

use anyhow::{ensure, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::embedding_to_bytes;
use crate::embedding::EMBEDDING_DIM;
use crate::memory::types::Recollection;

/// Store `text` with its embedding. Returns the new memory id (UUID v7).
pub fn add_memory(
    conn: &mut Connection,
    text: &str,
    metadata: Option<&Value>,
    embedding: &[f32],
) -> Result<String> {
    ensure!(
        embedding.len() == EMBEDDING_DIM,
        "embedding has {} dimensions, expected {EMBEDDING_DIM}",
        embedding.len()
    );

    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let metadata_json = metadata.map(serde_json::to_string).transpose()?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO memories (id, content, metadata, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, text, metadata_json, now],
    )?;
    tx.execute(
        "INSERT INTO memories_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )?;
    tx.commit()?;

    tracing::debug!(id = %id, content_len = text.len(), "long-term memory stored");
    Ok(id)
}

/// The `k` memories nearest to `query_embedding`, closest first.
pub fn retrieve(
    conn: &Connection,
    query_embedding: &[f32],
    k: usize,
) -> Result<Vec<Recollection>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    ensure!(
        query_embedding.len() == EMBEDDING_DIM,
        "query embedding has {} dimensions, expected {EMBEDDING_DIM}",
        query_embedding.len()
    );

    let mut stmt = conn.prepare(
        "SELECT id, distance FROM memories_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let neighbours: Vec<(String, f64)> = stmt
        .query_map(
            params![embedding_to_bytes(query_embedding), k as i64],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = Vec::with_capacity(neighbours.len());
    for (id, distance) in neighbours {
        let row: Option<(String, Option<String>)> = conn
            .query_row(
                "SELECT content, metadata FROM memories WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        // A vector without its text row is skipped rather than failing the recall.
        let Some((content, metadata)) = row else {
            tracing::warn!(id = %id, "vector row has no memory text");
            continue;
        };
        results.push(Recollection {
            id,
            content,
            metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
            distance,
        });
    }

    Ok(results)
}

pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))?;
    Ok(n as u64)
}

/// Delete every long-term memory and its vector.
pub fn reset(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM memories_vec;
         DELETE FROM memories;",
    )?;
    Ok(())
}
