//! Bounded external process execution.
//!
//! Everything the crate shells out to (git, chown, notify hooks) goes
//! through [`CommandRunner`]. Arguments are passed as a discrete argv —
//! never interpolated into a shell string — and every invocation has a hard
//! wall-clock timeout. An expired subprocess is killed, not left detached.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Captured outcome of a finished (or killed) subprocess. Transient value
/// object, never persisted.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `argv` and capture its output. Returns `Ok` with the timed-out
    /// flag set when the budget expires; the subprocess is killed and
    /// reaped on expiry, so it never continues running detached.
    pub async fn run(&self, argv: &[&str]) -> Result<CommandResult> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::InvalidInput("empty argument vector".to_string()))?;

        debug!(%program, ?args, "spawning");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolUnavailable(program.to_string())
            } else {
                Error::Io(e)
            }
        })?;

        // Drain the pipes concurrently with the wait so a chatty subprocess
        // never deadlocks on a full pipe buffer.
        let stdout_task = tokio::spawn(slurp(child.stdout.take()));
        let stderr_task = tokio::spawn(slurp(child.stderr.take()));

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                Ok(CommandResult {
                    exit_code: status.code().unwrap_or(-1),
                    stdout: stdout_task.await.unwrap_or_default(),
                    stderr: stderr_task.await.unwrap_or_default(),
                    timed_out: false,
                })
            }
            Err(_) => {
                // Kill and reap before returning so the caller can safely
                // clean up anything the subprocess was writing.
                child.kill().await.ok();
                stdout_task.abort();
                stderr_task.abort();
                Ok(CommandResult {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: String::new(),
                    timed_out: true,
                })
            }
        }
    }

    /// Like [`run`](Self::run) but maps timeout and non-zero exit to typed
    /// errors. This is what the tag discovery, installer, ownership, and
    /// notify paths use.
    pub async fn run_checked(&self, argv: &[&str]) -> Result<CommandResult> {
        let result = self.run(argv).await?;
        let program = argv.first().copied().unwrap_or_default();

        if result.timed_out {
            return Err(Error::CommandTimedOut {
                program: program.to_string(),
                timeout_secs: self.timeout.as_secs(),
            });
        }
        if result.exit_code != 0 {
            return Err(Error::CommandFailed {
                program: program.to_string(),
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }
}

async fn slurp<R>(reader: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;

    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        let _ = reader.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).to_string()
}
