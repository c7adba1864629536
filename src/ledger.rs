//! The installation ledger: persisted record of registered sources and
//! installed snapshots.
//!
//! All snapshot removal goes through [`Ledger::mark_removed`] — directory
//! delete first, then the status flip — so the ledger and the filesystem
//! never drift apart. Mutations are serialized through one async mutex to
//! rule out a remove-during-install race on the same record.

use std::path::{Path, PathBuf};

use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    HostingKind, InstalledSnapshot, RepositorySource, SnapshotStatus, SourceState,
};

pub struct Ledger {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    // ---- snapshots ----

    pub async fn record(&self, snapshot: &InstalledSnapshot) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            "INSERT INTO snapshots (id, source_url, module_name, tag, path, installed_at, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&snapshot.id)
        .bind(&snapshot.source_url)
        .bind(&snapshot.module_name)
        .bind(&snapshot.tag)
        .bind(snapshot.path.to_string_lossy().to_string())
        .bind(snapshot.installed_at)
        .bind(snapshot.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<InstalledSnapshot>> {
        let row = sqlx::query(
            "SELECT id, source_url, module_name, tag, path, installed_at, status
             FROM snapshots WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(snapshot_from_row))
    }

    pub async fn list(&self) -> Result<Vec<InstalledSnapshot>> {
        let rows = sqlx::query(
            "SELECT id, source_url, module_name, tag, path, installed_at, status
             FROM snapshots ORDER BY installed_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(snapshot_from_row).collect())
    }

    /// True when an Active snapshot already claims `path`.
    pub async fn path_claimed(&self, path: &Path) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM snapshots WHERE path = ? AND status = 'active'")
                .bind(path.to_string_lossy().to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Delete the snapshot's directory, then flip its status to Removed.
    /// This is the single entry point for removal; re-removal of an
    /// already-removed snapshot fails with `SnapshotNotActive`.
    pub async fn mark_removed(&self, id: &str) -> Result<InstalledSnapshot> {
        let _guard = self.write_lock.lock().await;

        let snapshot = self
            .get(id)
            .await?
            .ok_or_else(|| Error::SnapshotNotFound(id.to_string()))?;

        if snapshot.status != SnapshotStatus::Active {
            return Err(Error::SnapshotNotActive(id.to_string()));
        }

        // The status flip stays invisible until the directory is gone; a
        // failed delete rolls it back, so the row never goes Removed while
        // the directory survives and never stays Active after the delete.
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE snapshots SET status = 'removed' WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if snapshot.path.exists() {
            if let Err(err) = std::fs::remove_dir_all(&snapshot.path) {
                tx.rollback().await?;
                return Err(err.into());
            }
        } else {
            // Directory vanished out of band; still flip the record.
            warn!(path = %snapshot.path.display(), "install directory already gone");
        }

        tx.commit().await?;

        Ok(InstalledSnapshot {
            status: SnapshotStatus::Removed,
            ..snapshot
        })
    }

    // ---- sources ----

    pub async fn add_source(
        &self,
        name: &str,
        url: &str,
        clone_path: &Path,
    ) -> Result<RepositorySource> {
        let _guard = self.write_lock.lock().await;
        let source = RepositorySource {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            url: url.to_string(),
            hosting: HostingKind::detect(url),
            clone_path: clone_path.to_path_buf(),
            state: SourceState::Draft,
            tags: Vec::new(),
            last_sync: None,
            last_error: None,
        };
        sqlx::query(
            "INSERT INTO sources (id, name, url, hosting, clone_path, state)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&source.id)
        .bind(&source.name)
        .bind(&source.url)
        .bind(source.hosting.as_str())
        .bind(source.clone_path.to_string_lossy().to_string())
        .bind(source.state.as_str())
        .execute(&self.pool)
        .await?;
        Ok(source)
    }

    pub async fn get_source(&self, name: &str) -> Result<RepositorySource> {
        let row = sqlx::query(
            "SELECT id, name, url, hosting, clone_path, state, tags, last_sync, last_error
             FROM sources WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(source_from_row)
            .ok_or_else(|| Error::SourceNotFound(name.to_string()))
    }

    pub async fn list_sources(&self) -> Result<Vec<RepositorySource>> {
        let rows = sqlx::query(
            "SELECT id, name, url, hosting, clone_path, state, tags, last_sync, last_error
             FROM sources ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(source_from_row).collect())
    }

    pub async fn remove_source(&self, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM sources WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::SourceNotFound(name.to_string()));
        }
        Ok(())
    }

    /// Cache the discovery outcome on a source and mark it Validated.
    pub async fn mark_source_validated(
        &self,
        name: &str,
        tags: &[String],
        now: i64,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            "UPDATE sources SET state = 'validated', tags = ?, last_sync = ?, last_error = NULL
             WHERE name = ?",
        )
        .bind(tags.join("\n"))
        .bind(now)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_source_error(&self, name: &str, message: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("UPDATE sources SET state = 'error', last_error = ? WHERE name = ?")
            .bind(message)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn snapshot_from_row(row: sqlx::sqlite::SqliteRow) -> InstalledSnapshot {
    let path: String = row.get("path");
    let status: String = row.get("status");
    InstalledSnapshot {
        id: row.get("id"),
        source_url: row.get("source_url"),
        module_name: row.get("module_name"),
        tag: row.get("tag"),
        path: PathBuf::from(path),
        installed_at: row.get("installed_at"),
        status: SnapshotStatus::from_str(&status),
    }
}

fn source_from_row(row: sqlx::sqlite::SqliteRow) -> RepositorySource {
    let clone_path: String = row.get("clone_path");
    let hosting: String = row.get("hosting");
    let state: String = row.get("state");
    let tags: Option<String> = row.get("tags");
    RepositorySource {
        id: row.get("id"),
        name: row.get("name"),
        url: row.get("url"),
        hosting: if hosting == "gitlab" {
            HostingKind::GitLab
        } else {
            HostingKind::GitHub
        },
        clone_path: PathBuf::from(clone_path),
        state: SourceState::from_str(&state),
        tags: tags
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        last_sync: row.get("last_sync"),
        last_error: row.get("last_error"),
    }
}
