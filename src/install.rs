//! Snapshot installation: shallow, single-reference fetch of one tag into a
//! deterministically named directory.
//!
//! The install path naming convention `<module_name>_<tag>` under the
//! destination base is a compatibility contract — the ledger and external
//! tooling rely on it to avoid collisions and locate directories for
//! removal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{InstalledSnapshot, SnapshotStatus};
use crate::runner::CommandRunner;
use crate::validate::{self, RepoUrl};

/// In-process mutual exclusion keyed by normalized absolute install path.
/// Holding the lock makes the existence check and the fetch atomic with
/// respect to other installs; a second install for the same path fails with
/// `PathCollision` instead of racing.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    inner: Arc<Mutex<HashSet<PathBuf>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_acquire(&self, path: &Path) -> Option<PathLockGuard> {
        let mut held = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !held.insert(path.to_path_buf()) {
            return None;
        }
        Some(PathLockGuard {
            inner: Arc::clone(&self.inner),
            path: path.to_path_buf(),
        })
    }
}

struct PathLockGuard {
    inner: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        if let Ok(mut held) = self.inner.lock() {
            held.remove(&self.path);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Installer {
    runner: CommandRunner,
    locks: PathLocks,
}

impl Installer {
    pub fn new(runner: CommandRunner, locks: PathLocks) -> Self {
        Self { runner, locks }
    }

    /// Compute the deterministic install directory name for a module/tag
    /// pair. Tag separators (`/`) are mapped to `-` so the suffix stays a
    /// single path component.
    pub fn target_dir_name(module: &str, tag: &str) -> String {
        format!("{module}_{}", tag.replace('/', "-"))
    }

    /// Install `tag` of `url` under `dest_base`.
    ///
    /// Performs a depth-1, single-branch clone of exactly the named tag
    /// into a staging directory, verifies the result is non-empty, then
    /// renames it into place. Any failure removes the staging directory
    /// and any partially created target — no orphaned partial state.
    pub async fn install(
        &self,
        url: &RepoUrl,
        tag: &str,
        dest_base: &Path,
        desired_name: Option<&str>,
    ) -> Result<InstalledSnapshot> {
        validate::check_tag(tag)?;

        let module = match desired_name {
            Some(name) => {
                validate::check_module_name(name)?;
                name.to_string()
            }
            None => url.module_name(),
        };

        std::fs::create_dir_all(dest_base)?;
        // Canonicalize so the lock key and ledger path are unambiguous.
        let base = dest_base.canonicalize()?;
        let target = base.join(Self::target_dir_name(&module, tag));

        let _guard = self
            .locks
            .try_acquire(&target)
            .ok_or_else(|| Error::PathCollision(target.clone()))?;

        if target.exists() {
            return Err(Error::PathCollision(target));
        }

        // Stage under the destination base so the final rename never
        // crosses a filesystem boundary.
        let staging = base.join(format!(".modfetch-staging-{}", Uuid::new_v4()));

        info!(url = %url, tag, target = %target.display(), "installing snapshot");

        let staging_arg = staging.to_string_lossy().to_string();
        let clone = self
            .runner
            .run_checked(&[
                "git",
                "clone",
                "--depth",
                "1",
                "--branch",
                tag,
                "--single-branch",
                url.as_str(),
                &staging_arg,
            ])
            .await;

        if let Err(err) = clone {
            cleanup(&staging);
            return Err(err);
        }

        if !has_payload(&staging) {
            cleanup(&staging);
            return Err(Error::CommandFailed {
                program: "git".to_string(),
                stderr: "clone produced an empty tree".to_string(),
            });
        }

        if let Err(err) = std::fs::rename(&staging, &target) {
            cleanup(&staging);
            cleanup(&target);
            return Err(Error::Io(err));
        }

        Ok(InstalledSnapshot {
            id: Uuid::new_v4().to_string(),
            source_url: url.as_str().to_string(),
            module_name: module,
            tag: tag.to_string(),
            path: target,
            installed_at: Utc::now().timestamp(),
            status: SnapshotStatus::Active,
        })
    }
}

/// True when the directory holds anything beyond git metadata. Guards
/// against a clone that exited 0 but materialized nothing.
fn has_payload(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .any(|entry| entry.file_name() != ".git")
}

fn cleanup(path: &Path) {
    if path.exists() {
        if let Err(err) = std::fs::remove_dir_all(path) {
            warn!(path = %path.display(), %err, "could not clean up partial install");
        }
    }
}
