use sqlx::SqlitePool;

/// Create the document table and its FTS5 index. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            full_path TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            doc_type TEXT NOT NULL,
            index_time INTEGER NOT NULL,
            size INTEGER NOT NULL,
            text TEXT NOT NULL,
            artist TEXT,
            album TEXT,
            genre TEXT,
            title TEXT,
            track INTEGER,
            year INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='documents_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE documents_fts USING fts5(
                full_path UNINDEXED,
                file_name,
                text,
                artist,
                album,
                genre,
                title
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_mime_type ON documents(mime_type)")
        .execute(pool)
        .await?;

    Ok(())
}
