//! Typed errors for the install orchestrator.
//!
//! Every failure path surfaces one of these variants to the caller; nothing
//! is swallowed and nothing is retried automatically. Validation errors are
//! raised before any external process runs.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The external tool (git, chown, a notify hook) is not installed or
    /// not on PATH.
    #[error("required tool not available: {0}")]
    ToolUnavailable(String),

    /// The external tool ran and exited non-zero. Carries the captured
    /// stderr verbatim for diagnostics.
    #[error("command '{program}' failed: {stderr}")]
    CommandFailed { program: String, stderr: String },

    /// The external tool exceeded its wall-clock budget and was killed.
    #[error("command '{program}' timed out after {timeout_secs}s")]
    CommandTimedOut { program: String, timeout_secs: u64 },

    /// A URL, tag, or name was rejected before reaching the process layer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The computed install path already exists (or an install for it is
    /// in flight). Nothing was touched.
    #[error("install path already exists: {}", .0.display())]
    PathCollision(PathBuf),

    /// Ownership could not be applied. The installation itself succeeded;
    /// callers should surface this as a warning, not roll back.
    #[error("could not apply ownership: {0}")]
    PermissionDenied(String),

    /// The repository is reachable and valid but has no tags. Recoverable:
    /// the operator can retry once the repository publishes a release.
    #[error("no tags found in repository")]
    NoTagsFound,

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// `remove` was called on a snapshot that is not Active.
    #[error("snapshot is not active: {0}")]
    SnapshotNotActive(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
