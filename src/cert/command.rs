//! Subprocess boundary for the certificate tool.
//!
//! Everything the provisioner learns from the outside world about OpenSSL goes
//! through [`CommandRunner`]: an exit status and whatever the tool wrote to stderr.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

/// Result of running an external command to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    /// Captured standard error, lossily decoded
    pub stderr: String,
}

impl CommandStatus {
    /// A completed run with the given exit code and no stderr output.
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn from_output(status: ExitStatus, stderr: &[u8]) -> Self {
        Self {
            code: status.code(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}

/// Runs external programs.
///
/// An `Err` means the program could not be started at all (typically not found);
/// a started program that fails is reported through [`CommandStatus`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[OsString]) -> io::Result<CommandStatus>;
}

/// Runs programs as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &Path, args: &[OsString]) -> io::Result<CommandStatus> {
        tracing::debug!(program = %program.display(), ?args, "Running command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandStatus::from_output(output.status, &output.stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_success() {
        assert!(CommandStatus::with_code(0).success());
        assert!(!CommandStatus::with_code(1).success());
        let killed = CommandStatus {
            code: None,
            stderr: String::new(),
        };
        assert!(!killed.success());
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let result = SystemRunner
            .run(Path::new("devhttps-no-such-program-x9"), &[])
            .await;
        assert!(result.is_err());
    }
}
