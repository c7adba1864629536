//! Core data types shared across the install pipeline.

use std::path::PathBuf;

/// A tag discovered on a remote. Ephemeral — recomputed on every discovery
/// call, cached only as text on the owning source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReference {
    pub name: String,
    pub commit: Option<String>,
}

/// Which hosting service a source URL points at. Detection mirrors the
/// URL substrings operators actually use; anything unrecognized is treated
/// as GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostingKind {
    GitHub,
    GitLab,
}

impl HostingKind {
    pub fn detect(url: &str) -> Self {
        if url.contains("gitlab") {
            HostingKind::GitLab
        } else {
            HostingKind::GitHub
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostingKind::GitHub => "github",
            HostingKind::GitLab => "gitlab",
        }
    }
}

/// Lifecycle state of a registered repository source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Draft,
    Validated,
    Error,
}

impl SourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceState::Draft => "draft",
            SourceState::Validated => "validated",
            SourceState::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "validated" => SourceState::Validated,
            "error" => SourceState::Error,
            _ => SourceState::Draft,
        }
    }
}

/// A registered remote repository. Mutated only by the validation /
/// discovery flow; deleted by explicit operator action.
#[derive(Debug, Clone)]
pub struct RepositorySource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub hosting: HostingKind,
    pub clone_path: PathBuf,
    pub state: SourceState,
    /// Cached tag names from the last successful discovery, in the order
    /// the remote reported them.
    pub tags: Vec<String>,
    pub last_sync: Option<i64>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    Active,
    Removed,
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotStatus::Active => "active",
            SnapshotStatus::Removed => "removed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => SnapshotStatus::Active,
            _ => SnapshotStatus::Removed,
        }
    }
}

/// One installed tagged snapshot. Created only by a successful install;
/// flipped to Removed (directory deleted first) only through the ledger.
#[derive(Debug, Clone)]
pub struct InstalledSnapshot {
    pub id: String,
    pub source_url: String,
    pub module_name: String,
    pub tag: String,
    pub path: PathBuf,
    pub installed_at: i64,
    pub status: SnapshotStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosting_kind_detection() {
        assert_eq!(
            HostingKind::detect("https://github.com/org/repo"),
            HostingKind::GitHub
        );
        assert_eq!(
            HostingKind::detect("https://gitlab.example.com/org/repo"),
            HostingKind::GitLab
        );
        // Unknown hosts default to GitHub, matching operator expectations.
        assert_eq!(
            HostingKind::detect("https://git.example.com/org/repo"),
            HostingKind::GitHub
        );
    }

    #[test]
    fn test_state_round_trip() {
        for state in [SourceState::Draft, SourceState::Validated, SourceState::Error] {
            assert_eq!(SourceState::from_str(state.as_str()), state);
        }
        for status in [SnapshotStatus::Active, SnapshotStatus::Removed] {
            assert_eq!(SnapshotStatus::from_str(status.as_str()), status);
        }
    }
}
