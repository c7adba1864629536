//! Repository locator and tag-name validation.
//!
//! This is the sole injection-prevention boundary: every value that later
//! reaches the command runner as a repository location or tag must have
//! passed through here first. The checks are allow-lists — an allow-list
//! fails closed against attack strings we did not anticipate.

use crate::error::{Error, Result};

/// Characters that could be interpreted by a shell, used for command
/// substitution, or smuggled into an argv as something other than a plain
/// value. Whitespace and quotes are included: no legitimate remote locator
/// or tag contains them.
const SHELL_METACHARS: &[char] = &[
    ';', '|', '&', '`', '$', '(', ')', '<', '>', '\'', '"', '\\', ' ', '\t', '\n', '\r',
];

/// A repository locator that passed validation. The inner string is
/// normalized (trimmed, trailing `/` stripped) and safe to place in an
/// argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl(String);

impl RepoUrl {
    /// Validate and normalize a raw locator. Accepts `https://`, `http://`,
    /// and `ssh://` URLs plus scp-style `git@host:path` remotes whose host
    /// looks like a hosting domain. Rejects shell metacharacters, local
    /// filesystem paths, leading `-` (argument injection), and blank input.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = normalize(raw)?;

        if let Some(rest) = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .or_else(|| url.strip_prefix("ssh://"))
        {
            let authority = rest.split('/').next().unwrap_or_default();
            let host = authority.rsplit('@').next().unwrap_or_default();
            // Port suffixes are not part of recognized hosting locators.
            if !is_hostname(host) {
                return Err(Error::InvalidInput(format!(
                    "unrecognized repository host: '{host}'"
                )));
            }
            return Ok(Self(url));
        }

        if let Some((user, rest)) = url.split_once('@') {
            // scp-style: git@github.com:org/repo.git
            if let Some((host, path)) = rest.split_once(':') {
                if is_identifier(user)
                    && is_hostname(host)
                    && !path.is_empty()
                    && !path.starts_with('/')
                    && !path.starts_with('-')
                {
                    return Ok(Self(url));
                }
            }
            return Err(Error::InvalidInput(format!(
                "malformed scp-style remote: '{url}'"
            )));
        }

        Err(Error::InvalidInput(format!(
            "unsupported scheme or local path: '{url}'"
        )))
    }

    /// Wrap a locator that was vetted out of band (local mirrors, test
    /// fixtures). The remote-host allow-list is skipped; metacharacter
    /// screening still applies so the value stays argv-safe.
    pub fn trusted(raw: &str) -> Result<Self> {
        Ok(Self(normalize(raw)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Infer the logical module name: the last path segment with any
    /// `.git` suffix stripped.
    pub fn module_name(&self) -> String {
        let name = self
            .0
            .rsplit(['/', ':'])
            .find(|s| !s.is_empty())
            .unwrap_or("module");
        name.trim_end_matches(".git").to_string()
    }
}

impl std::fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/').to_string();
    if url.is_empty() {
        return Err(Error::InvalidInput("empty repository URL".to_string()));
    }
    if let Some(ch) = url.chars().find(|c| SHELL_METACHARS.contains(c) || c.is_control()) {
        return Err(Error::InvalidInput(format!(
            "repository URL contains forbidden character '{}'",
            ch.escape_default()
        )));
    }
    if url.starts_with('-') {
        return Err(Error::InvalidInput(
            "repository URL must not start with '-'".to_string(),
        ));
    }
    Ok(url)
}

fn is_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.contains('.')
        && !host.starts_with(['.', '-'])
        && !host.ends_with(['.', '-'])
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validate a tag name before it enters an argument vector. Tags are
/// attacker-influenced whenever discovery queried an untrusted remote, so
/// they get the same metacharacter policy as URLs.
pub fn check_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(Error::InvalidInput("empty tag name".to_string()));
    }
    if tag.starts_with(['-', '/']) || tag.contains("..") {
        return Err(Error::InvalidInput(format!("invalid tag name: '{tag}'")));
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '+' | '-'))
    {
        return Err(Error::InvalidInput(format!(
            "tag name contains forbidden characters: '{tag}'"
        )));
    }
    Ok(())
}

/// Validate an operator-chosen module name (used as a directory prefix).
pub fn check_module_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("empty module name".to_string()));
    }
    if name.starts_with(['-', '.'])
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(Error::InvalidInput(format!(
            "invalid module name: '{name}'"
        )));
    }
    Ok(())
}
