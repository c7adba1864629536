//! Remote tag discovery.
//!
//! Queries a repository's tag references with `git ls-remote --tags` — a
//! lightweight listing that transfers no history or working tree. The
//! returned order is whatever the remote reported; version-aware sorting is
//! a presentation concern left to the caller.

use tracing::info;

use crate::error::{Error, Result};
use crate::models::TagReference;
use crate::runner::CommandRunner;
use crate::validate::RepoUrl;

/// List the tags published by `url`. Fails with [`Error::NoTagsFound`] when
/// the repository is reachable but has zero releases — a recoverable
/// condition, not a problem with the repository itself.
pub async fn list_tags(url: &RepoUrl, runner: &CommandRunner) -> Result<Vec<TagReference>> {
    let result = runner
        .run_checked(&["git", "ls-remote", "--tags", url.as_str()])
        .await?;

    let tags = parse_ls_remote(&result.stdout);
    info!(url = %url, count = tags.len(), "discovered tags");

    if tags.is_empty() {
        return Err(Error::NoTagsFound);
    }
    Ok(tags)
}

/// Parse `git ls-remote --tags` output into tag references.
///
/// Annotated tags appear twice, once as `refs/tags/<name>` and once as the
/// peeled `refs/tags/<name>^{}`; peeled entries are skipped and duplicate
/// names keep their first occurrence, preserving discovery order.
pub fn parse_ls_remote(stdout: &str) -> Vec<TagReference> {
    let mut tags: Vec<TagReference> = Vec::new();

    for line in stdout.lines() {
        let mut parts = line.split_whitespace();
        let (Some(commit), Some(reference)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Some(name) = reference.strip_prefix("refs/tags/") else {
            continue;
        };
        if name.ends_with("^{}") {
            continue;
        }
        if tags.iter().any(|t| t.name == name) {
            continue;
        }
        tags.push(TagReference {
            name: name.to_string(),
            commit: Some(commit.to_string()),
        });
    }

    tags
}
