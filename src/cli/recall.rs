use anyhow::Result;

use moat::config::MoatConfig;
use moat::memory::vector;

/// Print the long-term memories closest to `query`.
pub async fn recall(config: &MoatConfig, query: &str, k: usize) -> Result<()> {
    let conn = moat::db::open_database(config.resolved_db_path())?;
    let provider = super::embedding_provider(config)?;
    let query_embedding = super::embed_one(&provider, query).await?;

    let hits = vector::retrieve(&conn, &query_embedding, k)?;
    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("  {}. {} (distance: {:.4})", i + 1, hit.id, hit.distance);
        println!("     {}", hit.content);
        if let Some(ref meta) = hit.metadata {
            println!("     metadata: {meta}");
        }
        println!();
    }
    Ok(())
}
