//! Index statistics.
//!
//! Provides a quick summary of what's indexed: document count, database
//! size, hash records and a per-type breakdown. Used by `fidx stats`.

use anyhow::{Context, Result};
use sqlx::Row;

use crate::config::Config;
use crate::hash_store::HashStore;
use crate::store::{IndexSink, SqliteSink};

/// Documents stored for one type (`doc_type`: the MIME type, or `audio`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeStats {
    pub doc_type: String,
    pub doc_count: i64,
    pub total_size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: i64,
    pub hash_records: usize,
    pub db_size: u64,
    pub by_type: Vec<TypeStats>,
}

/// Gather statistics for the configured index.
pub async fn collect_stats(config: &Config) -> Result<IndexStats> {
    let sink = SqliteSink::open(&config.storage.index_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open index at {}",
                config.storage.index_path.display()
            )
        })?;

    let documents = sink.count().await?;
    let rows = sqlx::query(
        r#"
        SELECT doc_type, COUNT(*) AS doc_count, COALESCE(SUM(size), 0) AS total_size
        FROM documents
        GROUP BY doc_type
        ORDER BY doc_count DESC, doc_type
        "#,
    )
    .fetch_all(sink.pool())
    .await?;
    sink.close().await?;

    let by_type = rows
        .iter()
        .map(|row| TypeStats {
            doc_type: row.get("doc_type"),
            doc_count: row.get("doc_count"),
            total_size: row.get("total_size"),
        })
        .collect();

    let hash_records = HashStore::new(&config.storage.hash_dir)
        .record_count()
        .with_context(|| {
            format!(
                "Failed to read hash directory {}",
                config.storage.hash_dir.display()
            )
        })?;

    let db_size = std::fs::metadata(&config.storage.index_path)
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(IndexStats {
        documents,
        hash_records,
        db_size,
        by_type,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let stats = collect_stats(config).await?;

    println!("fidx index stats");
    println!("================");
    println!();
    println!("  Index:         {}", config.storage.index_path.display());
    println!("  Size:          {}", format_bytes(stats.db_size));
    println!("  Hash records:  {}", stats.hash_records);
    println!();
    println!("  Documents:     {}", stats.documents);

    if !stats.by_type.is_empty() {
        println!();
        println!("  By type:");
        println!("  {:<32} {:>6} {:>10}", "TYPE", "DOCS", "BYTES");
        println!("  {}", "-".repeat(50));
        for t in &stats.by_type {
            println!(
                "  {:<32} {:>6} {:>10}",
                t.doc_type,
                t.doc_count,
                format_bytes(t.total_size.max(0) as u64)
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
