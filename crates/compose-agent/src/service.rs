//! `Deploy` RPC
//!
//! Maps each call onto the orchestrator and turns the result into either a
//! response or a gRPC status.

use crate::pb::deploy_docker_compose_server::DeployDockerCompose;
use crate::pb::{DeployDockerComposeRequest, DeployDockerComposeResponse};
use compose_agent_core::{
    DeployError, DeployLog, DeployPhase, DeployRequest, DeployResult, DeploymentOrchestrator,
    FileDeployLog, NullDeployLog,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Code, Request, Response, Status};

/// Metadata key carrying the elapsed seconds of a failed deployment
pub const TIME_TAKEN_METADATA: &str = "x-time-taken";
/// Metadata key carrying [`DeployError::code`]
pub const ERROR_KIND_METADATA: &str = "x-error-kind";

#[derive(Clone)]
pub struct DeployService {
    orchestrator: Arc<DeploymentOrchestrator>,
    log_dir: PathBuf,
    workers: Arc<Semaphore>,
}

impl DeployService {
    pub fn new(
        orchestrator: Arc<DeploymentOrchestrator>,
        log_dir: impl Into<PathBuf>,
        max_concurrent_deploys: usize,
    ) -> Self {
        Self {
            orchestrator,
            log_dir: log_dir.into(),
            workers: Arc::new(Semaphore::new(max_concurrent_deploys.max(1))),
        }
    }

    /// Run one deployment to a terminal state.
    ///
    /// The elapsed time covers the wait for a worker permit as well.
    pub async fn run_deploy(&self, request: DeployRequest) -> DeployResult {
        let accepted = Instant::now();

        if let Err(err) = request.validate() {
            tracing::warn!("Rejected deploy request: {}", err);
            return DeployResult::failure(err, DeployPhase::Idle, accepted.elapsed());
        }

        // The semaphore is never closed, so acquiring only fails on shutdown.
        let permit = self.workers.clone().acquire_owned().await.ok();

        let log = self.open_log(&request.service_name);
        let orchestrator = self.orchestrator.clone();
        let service_name = request.service_name.clone();

        // Run detached so a dropped client connection cannot stop the sequence half-way.
        // The permit moves with the task and is released only when the sequence ends.
        let task = tokio::spawn(async move {
            let _permit = permit;
            orchestrator.deploy(&request, log.as_ref()).await
        });

        let mut result = match task.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => std::panic::resume_unwind(join_err.into_panic()),
            Err(join_err) => {
                tracing::error!(service = %service_name, "Deploy task cancelled: {}", join_err);
                cancelled(join_err.to_string(), accepted.elapsed())
            }
        };
        result.elapsed = accepted.elapsed();
        result
    }

    /// Worker permits not currently held by a running deployment
    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// Per-service log target; falls back to tracing only if the file cannot be opened.
    fn open_log(&self, service_name: &str) -> Box<dyn DeployLog> {
        match FileDeployLog::open(&self.log_dir, service_name) {
            Ok(log) => Box::new(log),
            Err(e) => {
                tracing::warn!(
                    service = service_name,
                    "Cannot open log file in {}: {}",
                    self.log_dir.display(),
                    e
                );
                Box::new(NullDeployLog)
            }
        }
    }
}

/// The task's phase is not observable from here, so the failure is reported as `Idle`.
fn cancelled(reason: String, elapsed: Duration) -> DeployResult {
    DeployResult::failure(DeployError::Aborted(reason), DeployPhase::Idle, elapsed)
}

#[tonic::async_trait]
impl DeployDockerCompose for DeployService {
    async fn deploy(
        &self,
        request: Request<DeployDockerComposeRequest>,
    ) -> Result<Response<DeployDockerComposeResponse>, Status> {
        let payload = request.into_inner();
        tracing::info!(
            service = %payload.service_name,
            manifest_bytes = payload.docker_compose_yaml.len(),
            env_bytes = payload.env_file.len(),
            "Deploy requested"
        );

        let result = self
            .run_deploy(DeployRequest::new(
                payload.service_name,
                payload.docker_compose_yaml,
                payload.env_file,
            ))
            .await;

        into_response(result)
    }
}

/// Success becomes a response, failure a status whose code reflects the error kind.
pub fn into_response(
    result: DeployResult,
) -> Result<Response<DeployDockerComposeResponse>, Status> {
    let time_taken = result.elapsed_seconds();

    match result.error {
        None => Ok(Response::new(DeployDockerComposeResponse {
            message: result.message,
            time_taken: time_taken as f32,
        })),
        Some(err) => {
            let mut metadata = MetadataMap::new();
            let seconds = format!("{:.3}", time_taken);
            if let Ok(value) = MetadataValue::try_from(seconds.as_str()) {
                metadata.insert(TIME_TAKEN_METADATA, value);
            }
            metadata.insert(ERROR_KIND_METADATA, MetadataValue::from_static(err.code()));

            Err(Status::with_metadata(
                status_code(&err),
                result.message,
                metadata,
            ))
        }
    }
}

pub fn status_code(err: &DeployError) -> Code {
    match err {
        DeployError::InvalidRequest(_) | DeployError::Decode(_) => Code::InvalidArgument,
        DeployError::Staging(_) => Code::Internal,
        DeployError::ProcessLaunch { .. } => Code::Unavailable,
        DeployError::ProcessExit { .. } => Code::Aborted,
        DeployError::ProcessTimeout { .. } => Code::DeadlineExceeded,
        DeployError::Aborted(_) => Code::Cancelled,
    }
}

/// Elapsed seconds attached to a failure status, if any
pub fn time_taken_from_status(status: &Status) -> Option<Duration> {
    status
        .metadata()
        .get(TIME_TAKEN_METADATA)?
        .to_str()
        .ok()?
        .parse::<f64>()
        .ok()
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compose_agent_core::LifecycleCommand;

    #[test]
    fn test_success_response() {
        let response = into_response(DeployResult::success(Duration::from_millis(2500)))
            .unwrap()
            .into_inner();

        assert_eq!(response.message, "Success");
        assert_eq!(response.time_taken, 2.5);
    }

    #[test]
    fn test_failure_status_carries_kind_and_time() {
        let err = DeployError::ProcessExit {
            step: LifecycleCommand::Pull,
            exit_code: Some(1),
            stdout: String::new(),
            stderr: String::new(),
        };
        let status = into_response(DeployResult::failure(
            err,
            DeployPhase::Pulling,
            Duration::from_millis(1250),
        ))
        .unwrap_err();

        assert_eq!(status.code(), Code::Aborted);
        assert_eq!(status.message(), "docker compose pull exited with status 1");
        assert_eq!(
            status.metadata().get(ERROR_KIND_METADATA).unwrap(),
            "process_exit"
        );
        assert_eq!(
            time_taken_from_status(&status),
            Some(Duration::from_millis(1250))
        );
    }

    #[test]
    fn test_cancelled_result_keeps_non_terminal_phase() {
        let result = cancelled("runtime shutting down".to_string(), Duration::from_millis(5));

        assert!(!result.is_success());
        assert_eq!(result.last_phase, DeployPhase::Idle);
        assert!(!result.last_phase.is_terminal());
        assert_eq!(result.error.as_ref().map(|e| e.code()), Some("aborted"));
        assert_eq!(
            status_code(result.error.as_ref().unwrap()),
            Code::Cancelled
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_code(&DeployError::InvalidRequest("x".to_string())),
            Code::InvalidArgument
        );
        assert_eq!(
            status_code(&DeployError::ProcessTimeout {
                step: LifecycleCommand::Up,
                timeout: Duration::from_secs(1),
            }),
            Code::DeadlineExceeded
        );
    }
}
