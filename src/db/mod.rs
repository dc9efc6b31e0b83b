//! Database access for dpr-intake
//!
//! SQLite is the only backing store. Nested result payloads (risk factors,
//! compliance issues, analysis data) live in JSON TEXT columns; timestamps
//! are RFC 3339 TEXT.

pub mod analyses;
pub mod users;

use crate::error::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects with mode=rwc (read, write, create) and runs table migrations.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create dpr-intake tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dpr_analyses (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            file_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'processing',
            uploaded_at TEXT NOT NULL,
            analyzed_at TEXT,
            language TEXT NOT NULL DEFAULT 'en',
            extracted_text TEXT,
            overall_score INTEGER,
            completeness_score INTEGER,
            compliance_score INTEGER,
            risk_level TEXT,
            risk_factors TEXT,
            compliance_issues TEXT,
            analysis_data TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (dpr_analyses, users)");

    Ok(())
}

// A pooled in-memory SQLite gives every connection its own database, so
// tests pin the pool to a single long-lived connection.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    init_tables(&pool).await.expect("table init");
    pool
}
