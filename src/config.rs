use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub install: InstallConfig,
    #[serde(default)]
    pub ownership: Option<OwnershipConfig>,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InstallConfig {
    /// Root directory under which snapshots are placed.
    pub destination_base: PathBuf,
    /// Wall-clock budget for every external command (git, chown, hooks).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

impl InstallConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Identity applied recursively to each installed tree. Optional: when
/// absent, files keep whatever owner the process created them with.
#[derive(Debug, Deserialize, Clone)]
pub struct OwnershipConfig {
    pub user: String,
    pub group: String,
}

/// Post-install hooks supplied by the host application, as argument
/// vectors (never shell strings).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifyConfig {
    #[serde(default)]
    pub refresh_command: Option<Vec<String>>,
    #[serde(default)]
    pub restart_command: Option<Vec<String>>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !config.install.destination_base.is_absolute() {
        anyhow::bail!("install.destination_base must be an absolute path");
    }

    if config.install.timeout_secs == 0 {
        anyhow::bail!("install.timeout_secs must be > 0");
    }

    for (name, argv) in [
        ("notify.refresh_command", &config.notify.refresh_command),
        ("notify.restart_command", &config.notify.restart_command),
    ] {
        if let Some(argv) = argv {
            if argv.is_empty() {
                anyhow::bail!("{} must not be an empty argument vector", name);
            }
        }
    }

    Ok(config)
}
