//! Recursive ownership enforcement for installed trees.
//!
//! Runs `chown -R user:group` through the command runner. This step is
//! best-effort-reportable: the install already completed, so a failure here
//! surfaces as [`Error::PermissionDenied`] for the caller to log as a
//! warning rather than roll anything back.

use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::runner::CommandRunner;

/// Apply `user:group` to every entry under `path`.
pub async fn apply_ownership(
    path: &Path,
    user: &str,
    group: &str,
    runner: &CommandRunner,
) -> Result<()> {
    check_identity(user)?;
    check_identity(group)?;

    info!(path = %path.display(), user, group, "applying ownership");

    let spec = format!("{user}:{group}");
    let path_arg = path.to_string_lossy().to_string();
    runner
        .run_checked(&["chown", "-R", &spec, &path_arg])
        .await
        .map_err(|err| Error::PermissionDenied(err.to_string()))?;

    Ok(())
}

/// Owner identities become argv elements; keep them to plain account-name
/// characters.
fn check_identity(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('-')
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(Error::InvalidInput(format!(
            "invalid owner identity: '{name}'"
        )));
    }
    Ok(())
}
