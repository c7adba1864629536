//! The narrow call surface consumed by the host application.
//!
//! Wires validator → tag discovery → installer → ownership → ledger →
//! notifier. Ownership and notification failures never fail an install
//! that already completed; they come back as warnings on the report.

use std::path::PathBuf;

use sqlx::SqlitePool;
use tracing::warn;

use crate::config::Config;
use crate::db;
use crate::error::{Error, Result};
use crate::install::{Installer, PathLocks};
use crate::ledger::Ledger;
use crate::models::{InstalledSnapshot, RepositorySource, TagReference};
use crate::notify::Notifier;
use crate::ownership;
use crate::runner::CommandRunner;
use crate::tags;
use crate::validate::{self, RepoUrl};

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub url: RepoUrl,
    pub tag: String,
    pub desired_name: Option<String>,
    /// Overrides `install.destination_base` from the config when set.
    pub destination_base: Option<PathBuf>,
    pub update_module_list: bool,
    pub restart: bool,
}

/// A completed install plus any best-effort steps that went wrong along
/// the way (ownership, notifications).
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub snapshot: InstalledSnapshot,
    pub warnings: Vec<String>,
}

pub struct Service {
    config: Config,
    ledger: Ledger,
    runner: CommandRunner,
    installer: Installer,
    notifier: Notifier,
}

impl Service {
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        Ok(Self::with_pool(config, pool))
    }

    pub fn with_pool(config: Config, pool: SqlitePool) -> Self {
        let runner = CommandRunner::new(config.install.timeout());
        let installer = Installer::new(runner.clone(), PathLocks::new());
        let notifier = Notifier::from_config(&config.notify);
        Self {
            config,
            ledger: Ledger::new(pool),
            runner,
            installer,
            notifier,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Validate a raw locator and list the tags it publishes. Read-only;
    /// safe to run concurrently with anything else.
    pub async fn validate_and_discover(&self, raw_url: &str) -> Result<Vec<TagReference>> {
        let url = RepoUrl::parse(raw_url)?;
        self.probe_git().await?;
        tags::list_tags(&url, &self.runner).await
    }

    /// Register a repository source (state Draft until validated).
    pub async fn register_source(
        &self,
        name: &str,
        raw_url: &str,
        clone_path: Option<PathBuf>,
    ) -> Result<RepositorySource> {
        let url = RepoUrl::parse(raw_url)?;
        let clone_path =
            clone_path.unwrap_or_else(|| self.config.install.destination_base.clone());
        self.ledger
            .add_source(name, url.as_str(), &clone_path)
            .await
    }

    /// Validate a registered source: probe the tool, discover tags, cache
    /// them, and flip the source to Validated. On failure the source is
    /// flipped to Error with the message preserved.
    pub async fn validate_source(&self, name: &str) -> Result<Vec<TagReference>> {
        let source = self.ledger.get_source(name).await?;
        let url = RepoUrl::parse(&source.url)?;

        let discovered = async {
            self.probe_git().await?;
            tags::list_tags(&url, &self.runner).await
        }
        .await;

        match discovered {
            Ok(tag_refs) => {
                let names: Vec<String> = tag_refs.iter().map(|t| t.name.clone()).collect();
                self.ledger
                    .mark_source_validated(name, &names, chrono::Utc::now().timestamp())
                    .await?;
                Ok(tag_refs)
            }
            Err(err) => {
                self.ledger.mark_source_error(name, &err.to_string()).await?;
                Err(err)
            }
        }
    }

    /// Install one tagged snapshot. The install itself is all-or-nothing;
    /// ownership and notify hooks run afterwards and report into
    /// [`InstallReport::warnings`].
    pub async fn install(&self, request: InstallRequest) -> Result<InstallReport> {
        let module = match &request.desired_name {
            Some(name) => {
                validate::check_module_name(name)?;
                name.clone()
            }
            None => request.url.module_name(),
        };
        let dest_base = request
            .destination_base
            .clone()
            .unwrap_or_else(|| self.config.install.destination_base.clone());

        // Ledger-level uniqueness before any filesystem work: an Active
        // entry implies the directory exists.
        std::fs::create_dir_all(&dest_base)?;
        let target = dest_base
            .canonicalize()?
            .join(Installer::target_dir_name(&module, &request.tag));
        if self.ledger.path_claimed(&target).await? {
            return Err(Error::PathCollision(target));
        }

        let snapshot = self
            .installer
            .install(&request.url, &request.tag, &dest_base, Some(&module))
            .await?;

        let mut warnings = Vec::new();

        if let Some(own) = &self.config.ownership {
            if let Err(err) =
                ownership::apply_ownership(&snapshot.path, &own.user, &own.group, &self.runner)
                    .await
            {
                warn!(%err, "ownership step failed");
                warnings.push(err.to_string());
            }
        }

        // A snapshot the ledger does not track must not stay on disk.
        if let Err(err) = self.ledger.record(&snapshot).await {
            warn!(%err, path = %snapshot.path.display(), "discarding untracked install");
            if let Err(cleanup_err) = std::fs::remove_dir_all(&snapshot.path) {
                warn!(%cleanup_err, "failed to discard install directory");
            }
            return Err(err);
        }

        if request.update_module_list {
            if let Err(err) = self.notifier.refresh_module_list(&self.runner).await {
                warn!(%err, "module-list refresh hook failed");
                warnings.push(format!("module-list refresh failed: {err}"));
            }
        }
        if request.restart {
            if let Err(err) = self.notifier.restart(&self.runner).await {
                warn!(%err, "restart hook failed");
                warnings.push(format!("restart failed: {err}"));
            }
        }

        Ok(InstallReport { snapshot, warnings })
    }

    /// Remove an Active snapshot: delete its directory, then flip its
    /// ledger status.
    pub async fn remove(&self, snapshot_id: &str) -> Result<InstalledSnapshot> {
        self.ledger.mark_removed(snapshot_id).await
    }

    pub async fn snapshots(&self) -> Result<Vec<InstalledSnapshot>> {
        self.ledger.list().await
    }

    pub async fn sources(&self) -> Result<Vec<RepositorySource>> {
        self.ledger.list_sources().await
    }

    pub async fn remove_source(&self, name: &str) -> Result<()> {
        self.ledger.remove_source(name).await
    }

    async fn probe_git(&self) -> Result<()> {
        self.runner.run_checked(&["git", "--version"]).await?;
        Ok(())
    }
}
