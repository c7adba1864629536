//! Best-effort post-install notifications.
//!
//! The host application supplies the hooks (a module-list refresh call and
//! a service restart trigger) as configured argument vectors; the core only
//! invokes them. Both are conveniences, not correctness requirements: a
//! hook failure is reported to the caller as its own outcome and never
//! rolls back or fails the already-completed install.

use tracing::{debug, info};

use crate::config::NotifyConfig;
use crate::error::Result;
use crate::runner::CommandRunner;

#[derive(Debug, Clone, Default)]
pub struct Notifier {
    refresh_command: Option<Vec<String>>,
    restart_command: Option<Vec<String>>,
}

/// Outcome of a single notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Ran,
    /// No hook configured; nothing to do.
    Skipped,
}

impl Notifier {
    pub fn from_config(config: &NotifyConfig) -> Self {
        Self {
            refresh_command: config.refresh_command.clone(),
            restart_command: config.restart_command.clone(),
        }
    }

    /// Ask the host application to refresh its module list.
    pub async fn refresh_module_list(&self, runner: &CommandRunner) -> Result<NotifyOutcome> {
        self.invoke("module-list refresh", &self.refresh_command, runner)
            .await
    }

    /// Trigger a service restart (typically a signal or a service-manager
    /// call).
    pub async fn restart(&self, runner: &CommandRunner) -> Result<NotifyOutcome> {
        self.invoke("restart", &self.restart_command, runner).await
    }

    async fn invoke(
        &self,
        what: &str,
        command: &Option<Vec<String>>,
        runner: &CommandRunner,
    ) -> Result<NotifyOutcome> {
        let Some(argv) = command else {
            debug!(what, "no hook configured, skipping");
            return Ok(NotifyOutcome::Skipped);
        };
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        runner.run_checked(&argv).await?;
        info!(what, "notification hook ran");
        Ok(NotifyOutcome::Ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn runner() -> CommandRunner {
        CommandRunner::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_unconfigured_hooks_are_skipped() {
        let notifier = Notifier::default();
        assert_eq!(
            notifier.refresh_module_list(&runner()).await.unwrap(),
            NotifyOutcome::Skipped
        );
        assert_eq!(
            notifier.restart(&runner()).await.unwrap(),
            NotifyOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_configured_hook_runs() {
        let notifier = Notifier::from_config(&NotifyConfig {
            refresh_command: Some(vec!["true".to_string()]),
            restart_command: None,
        });
        assert_eq!(
            notifier.refresh_module_list(&runner()).await.unwrap(),
            NotifyOutcome::Ran
        );
    }

    #[tokio::test]
    async fn test_hook_failure_is_reported_not_swallowed() {
        let notifier = Notifier::from_config(&NotifyConfig {
            refresh_command: None,
            restart_command: Some(vec!["false".to_string()]),
        });
        assert!(notifier.restart(&runner()).await.is_err());
    }
}
