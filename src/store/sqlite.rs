//! SQLite FTS5 index sink.
//!
//! Documents live in a plain `documents` table keyed by path; a
//! `documents_fts` virtual table mirrors the searchable columns. Both are
//! written in one transaction per document.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::IndexSink;
use crate::db;
use crate::error::SinkError;
use crate::migrate;
use crate::models::{Document, QueryRequest, QueryResponse, SearchHit};

/// Searchable FTS5 columns, in table order after `full_path` (column 0).
const FTS_COLUMNS: &[&str] = &["file_name", "text", "artist", "album", "genre", "title"];

/// Tokens of context around a match in `text` fragments.
const SNIPPET_TOKENS: i64 = 24;

pub struct SqliteSink {
    pool: SqlitePool,
    closed: AtomicBool,
}

impl SqliteSink {
    /// Open the database at `path`, creating it and its schema if needed.
    pub async fn open(path: &Path) -> Result<Self, SinkError> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        tracing::debug!("opened index {}", path.display());
        Ok(Self {
            pool,
            closed: AtomicBool::new(false),
        })
    }

    /// Open an existing index for queries only. The schema is not created
    /// and every write is rejected by SQLite.
    pub async fn open_read_only(path: &Path) -> Result<Self, SinkError> {
        let pool = db::connect_read_only(path).await?;
        sqlx::query("SELECT 1 FROM documents_fts LIMIT 1")
            .fetch_optional(&pool)
            .await?;
        tracing::debug!("opened index {} read-only", path.display());
        Ok(Self {
            pool,
            closed: AtomicBool::new(false),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn ensure_open(&self) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }
        Ok(())
    }

    /// Total number of stored documents.
    pub async fn count(&self) -> Result<i64, SinkError> {
        self.ensure_open()?;
        let n = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl IndexSink for SqliteSink {
    async fn put(&self, doc: &Document) -> Result<(), SinkError> {
        self.ensure_open()?;
        let file = doc.file();
        let tags = doc.tags();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents
                (full_path, file_name, mime_type, doc_type, index_time, size, text,
                 artist, album, genre, title, track, year)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(full_path) DO UPDATE SET
                file_name = excluded.file_name,
                mime_type = excluded.mime_type,
                doc_type = excluded.doc_type,
                index_time = excluded.index_time,
                size = excluded.size,
                text = excluded.text,
                artist = excluded.artist,
                album = excluded.album,
                genre = excluded.genre,
                title = excluded.title,
                track = excluded.track,
                year = excluded.year
            "#,
        )
        .bind(&file.full_path)
        .bind(&file.file_name)
        .bind(&file.mime_type)
        .bind(doc.doc_type())
        .bind(file.index_time.timestamp())
        .bind(file.size as i64)
        .bind(&file.text)
        .bind(tags.map(|t| t.artist.as_str()))
        .bind(tags.map(|t| t.album.as_str()))
        .bind(tags.map(|t| t.genre.as_str()))
        .bind(tags.map(|t| t.title.as_str()))
        .bind(tags.map(|t| t.track as i64))
        .bind(tags.map(|t| t.year as i64))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM documents_fts WHERE full_path = ?")
            .bind(&file.full_path)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO documents_fts (full_path, file_name, text, artist, album, genre, title) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.full_path)
        .bind(&file.file_name)
        .bind(&file.text)
        .bind(tags.map(|t| t.artist.as_str()).unwrap_or(""))
        .bind(tags.map(|t| t.album.as_str()).unwrap_or(""))
        .bind(tags.map(|t| t.genre.as_str()).unwrap_or(""))
        .bind(tags.map(|t| t.title.as_str()).unwrap_or(""))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, SinkError> {
        self.ensure_open()?;
        let Some(fts) = fts_query(&request.query) else {
            return Ok(QueryResponse {
                hits: Vec::new(),
                total: 0,
                from: request.from,
            });
        };

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents_fts WHERE documents_fts MATCH ?")
                .bind(&fts)
                .fetch_one(&self.pool)
                .await?;

        let (open, close) = request
            .highlight
            .as_ref()
            .map(|h| (h.open.as_str(), h.close.as_str()))
            .unwrap_or(("", ""));

        let sql = format!(
            r#"
            SELECT f.full_path AS full_path, bm25(documents_fts) AS rank, {fragments},
                   d.file_name AS file_name, d.doc_type AS doc_type,
                   d.artist AS artist, d.album AS album, d.genre AS genre, d.title AS title,
                   d.track AS track, d.year AS year
            FROM documents_fts f
            JOIN documents d ON d.full_path = f.full_path
            WHERE documents_fts MATCH ?
            ORDER BY rank
            LIMIT ? OFFSET ?
            "#,
            fragments = fragment_columns()
        );

        let mut query = sqlx::query(&sql);
        for _ in FTS_COLUMNS {
            query = query.bind(open).bind(close);
        }
        let rows = query
            .bind(&fts)
            .bind(request.limit)
            .bind(request.from)
            .fetch_all(&self.pool)
            .await?;

        let hits = rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                let fragments = if request.highlight.is_some() {
                    FTS_COLUMNS
                        .iter()
                        .filter_map(|col| {
                            let frag: String = row.get(format!("hl_{}", col).as_str());
                            frag.contains(open)
                                .then(|| (col.to_string(), vec![frag]))
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                SearchHit {
                    id: row.get("full_path"),
                    score: -rank,
                    fragments,
                    fields: stored_fields(row),
                }
            })
            .collect();

        Ok(QueryResponse {
            hits,
            total,
            from: request.from,
        })
    }

    async fn close(&self) -> Result<(), SinkError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.pool.close().await;
        }
        Ok(())
    }
}

fn fragment_columns() -> String {
    FTS_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let idx = i + 1;
            if *col == "text" {
                format!(
                    "snippet(documents_fts, {}, ?, ?, '...', {}) AS hl_{}",
                    idx, SNIPPET_TOKENS, col
                )
            } else {
                format!("highlight(documents_fts, {}, ?, ?) AS hl_{}", idx, col)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn stored_fields(row: &sqlx::sqlite::SqliteRow) -> Vec<(String, String)> {
    let mut fields = vec![
        ("file_name".to_string(), row.get::<String, _>("file_name")),
        ("type".to_string(), row.get::<String, _>("doc_type")),
    ];
    for col in ["artist", "album", "genre", "title"] {
        if let Some(value) = row.get::<Option<String>, _>(col) {
            if !value.is_empty() {
                fields.push((col.to_string(), value));
            }
        }
    }
    for col in ["track", "year"] {
        if let Some(value) = row.get::<Option<i64>, _>(col) {
            if value > 0 {
                fields.push((col.to_string(), value.to_string()));
            }
        }
    }
    fields
}

/// Turn free text into an FTS5 query: every whitespace-separated term
/// becomes a quoted string, any of which may match.
///
/// Returns `None` when there is nothing to search for.
pub(crate) fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" OR "))
}
