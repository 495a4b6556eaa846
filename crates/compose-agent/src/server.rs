//! gRPC サーバーの組み立て

use crate::pb::deploy_docker_compose_server::DeployDockerComposeServer;
use crate::service::DeployService;
use anyhow::{Context, Result};
use compose_agent_config::AgentConfig;
use compose_agent_core::{
    DeploymentOrchestrator, OrchestratorConfig, ProcessRunner, StagingArea, TokioProcessRunner,
};
use std::future::Future;
use std::sync::Arc;
use tonic::transport::Server;

/// 設定からデプロイサービスを組み立てる
pub fn build_service(config: &AgentConfig, runner: Arc<dyn ProcessRunner>) -> DeployService {
    let orchestrator = DeploymentOrchestrator::new(
        StagingArea::new(&config.staging_root),
        runner,
        OrchestratorConfig {
            docker_binary: config.docker_binary.clone(),
            command_timeout: config.command_timeout(),
        },
    );

    DeployService::new(
        Arc::new(orchestrator),
        &config.log_dir,
        config.max_concurrent_deploys,
    )
}

/// `shutdown` が完了するまで待ち受ける
pub async fn serve<F>(config: &AgentConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::fs::create_dir_all(&config.staging_root)
        .await
        .with_context(|| format!("Failed to create {}", config.staging_root.display()))?;
    tokio::fs::create_dir_all(&config.log_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.log_dir.display()))?;

    let service = build_service(config, Arc::new(TokioProcessRunner::new()));

    tracing::info!(
        addr = %config.listen_addr,
        staging_root = %config.staging_root.display(),
        log_dir = %config.log_dir.display(),
        max_concurrent_deploys = config.max_concurrent_deploys,
        "Deploy agent listening"
    );

    Server::builder()
        .add_service(DeployDockerComposeServer::new(service))
        .serve_with_shutdown(config.listen_addr, shutdown)
        .await
        .with_context(|| format!("gRPC server on {} failed", config.listen_addr))?;

    tracing::info!("Deploy agent stopped");
    Ok(())
}
