//! Deployment request / result types

use crate::error::DeployError;
use std::fmt;
use std::time::Duration;

/// Message returned for a completed deployment
pub const SUCCESS_MESSAGE: &str = "Success";

/// One deployment request as received from the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Key for the staging directory, the log file and the compose project
    pub service_name: String,
    /// Compose manifest (YAML)
    pub manifest: Vec<u8>,
    /// Env file passed to compose as-is
    pub env_file: Vec<u8>,
}

impl DeployRequest {
    pub fn new(
        service_name: impl Into<String>,
        manifest: impl Into<Vec<u8>>,
        env_file: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            manifest: manifest.into(),
            env_file: env_file.into(),
        }
    }

    /// Check that the service name is usable as a single path component.
    pub fn validate(&self) -> Result<(), DeployError> {
        validate_service_name(&self.service_name)
    }
}

pub fn validate_service_name(name: &str) -> Result<(), DeployError> {
    let invalid = |reason: &str| -> Result<(), DeployError> {
        Err(DeployError::InvalidRequest(format!(
            "service name '{}' {}",
            name.escape_default(),
            reason
        )))
    };

    if name.is_empty() {
        return invalid("is empty");
    }
    if name == "." || name == ".." {
        return invalid("is not a valid directory name");
    }
    if name.starts_with('-') {
        return invalid("must not start with '-'");
    }
    if name.contains(['/', '\\', '\0']) {
        return invalid("must not contain path separators");
    }
    if name.chars().any(char::is_control) {
        return invalid("must not contain control characters");
    }

    Ok(())
}

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Idle,
    Staging,
    Stopping,
    Pulling,
    Starting,
    Done,
    Failed,
}

impl DeployPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployPhase::Done | DeployPhase::Failed)
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployPhase::Idle => "idle",
            DeployPhase::Staging => "staging",
            DeployPhase::Stopping => "stopping",
            DeployPhase::Pulling => "pulling",
            DeployPhase::Starting => "starting",
            DeployPhase::Done => "done",
            DeployPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStatus {
    Success,
    Failure,
}

/// Outcome of one `deploy` call
#[derive(Debug)]
pub struct DeployResult {
    pub status: DeployStatus,
    pub message: String,
    /// Wall-clock time from acceptance to the terminal state
    pub elapsed: Duration,
    /// Phase the orchestrator was in when it stopped
    pub last_phase: DeployPhase,
    pub error: Option<DeployError>,
}

impl DeployResult {
    pub fn success(elapsed: Duration) -> Self {
        Self {
            status: DeployStatus::Success,
            message: SUCCESS_MESSAGE.to_string(),
            elapsed,
            last_phase: DeployPhase::Done,
            error: None,
        }
    }

    pub fn failure(error: DeployError, failed_in: DeployPhase, elapsed: Duration) -> Self {
        Self {
            status: DeployStatus::Failure,
            message: error.to_string(),
            elapsed,
            last_phase: failed_in,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeployStatus::Success
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}
