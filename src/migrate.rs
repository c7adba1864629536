use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the ledger schema. Idempotent — safe to run on every startup.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Registered repository sources
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            url TEXT NOT NULL,
            hosting TEXT NOT NULL DEFAULT 'github',
            clone_path TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'draft',
            tags TEXT,
            last_sync INTEGER,
            last_error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Installed snapshots. Removed rows are kept for history, so the
    // collision backstop for the deterministic <module>_<tag> naming is a
    // partial index over active rows only; a removed snapshot's path can
    // be claimed again by a later install.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY,
            source_url TEXT NOT NULL,
            module_name TEXT NOT NULL,
            tag TEXT NOT NULL,
            path TEXT NOT NULL,
            installed_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'active'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS snapshots_active_path
         ON snapshots (path) WHERE status = 'active'",
    )
    .execute(pool)
    .await?;

    Ok(())
}
