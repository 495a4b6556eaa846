//! External process runner
//!
//! Runs one command to completion and captures both output streams.
//! A non-zero exit is reported through [`ProcessOutcome`], not as an error;
//! errors are reserved for commands that never ran to completion.

use crate::error::ProcessError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Result of a command that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Process execution abstraction
///
/// The orchestrator only talks to this trait, so tests can record
/// invocations without spawning anything.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `argv[0]` with the remaining arguments and wait for it to exit.
    ///
    /// When `timeout` elapses the child is killed and
    /// [`ProcessError::Timeout`] is returned.
    async fn run(
        &self,
        argv: &[String],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutcome, ProcessError>;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        argv: &[String],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutcome, ProcessError> {
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // タイムアウトで future が破棄されたときに子プロセスも止める
        cmd.kill_on_drop(true);

        tracing::debug!("Running: {}", argv.join(" "));

        let child = cmd.spawn().map_err(|source| ProcessError::Launch {
            program: program.clone(),
            source,
        })?;

        let waited = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ProcessError::Timeout {
                    program: program.clone(),
                    timeout: limit,
                })?,
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|source| ProcessError::Launch {
            program: program.clone(),
            source,
        })?;

        Ok(ProcessOutcome {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
