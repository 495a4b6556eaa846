//! デプロイのオーケストレーション
//!
//! `Idle → Staging → Stopping → Pulling → Starting → {Done, Failed}`
//! の一本道の状態機械。リトライも補償処理もしない。Pull で失敗した場合、
//! 旧スタックは停止したまま新スタックも起動しない。

use crate::error::{DeployError, ProcessError, Result};
use crate::lifecycle::{LifecycleCommand, project_name};
use crate::log::DeployLog;
use crate::manifest::Manifest;
use crate::model::{DeployPhase, DeployRequest, DeployResult};
use crate::process::ProcessRunner;
use crate::staging::{StagedFiles, StagingArea};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// コマンドごとのデフォルトのタイムアウト
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// compose を提供するバイナリ（通常は `docker`）
    pub docker_binary: String,
    /// 1コマンドあたりの上限時間。None なら無制限
    pub command_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            docker_binary: "docker".to_string(),
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

/// 状態遷移を tracing とデプロイログの両方に記録する
struct PhaseTracker<'a> {
    service_name: &'a str,
    phase: DeployPhase,
    log: &'a dyn DeployLog,
}

impl<'a> PhaseTracker<'a> {
    fn new(service_name: &'a str, log: &'a dyn DeployLog) -> Self {
        Self {
            service_name,
            phase: DeployPhase::Idle,
            log,
        }
    }

    fn enter(&mut self, next: DeployPhase) {
        tracing::debug!(
            service = self.service_name,
            "Phase {} -> {}",
            self.phase,
            next
        );
        self.log.info(&format!("phase: {} -> {}", self.phase, next));
        self.phase = next;
    }
}

pub struct DeploymentOrchestrator {
    staging: StagingArea,
    runner: Arc<dyn ProcessRunner>,
    config: OrchestratorConfig,
    /// compose プロジェクトごとのロック。使われなくなったエントリは解放時に取り除く
    service_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeploymentOrchestrator {
    pub fn new(
        staging: StagingArea,
        runner: Arc<dyn ProcessRunner>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            staging,
            runner,
            config,
            service_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// 1回分のデプロイを実行する
    ///
    /// 経過時間は受付から終端状態までを計測し、成否に関わらず結果に含める。
    pub async fn deploy(&self, request: &DeployRequest, log: &dyn DeployLog) -> DeployResult {
        let started = Instant::now();
        let mut tracker = PhaseTracker::new(&request.service_name, log);

        let outcome = self.run(request, &mut tracker).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(()) => {
                tracker.enter(DeployPhase::Done);
                tracing::info!(
                    service = %request.service_name,
                    "Deployment finished in {:.2}s",
                    elapsed.as_secs_f64()
                );
                log.info(&format!(
                    "deployment succeeded in {:.2}s",
                    elapsed.as_secs_f64()
                ));
                DeployResult::success(elapsed)
            }
            Err(err) => {
                let failed_in = tracker.phase;
                tracker.enter(DeployPhase::Failed);
                tracing::error!(
                    service = %request.service_name,
                    phase = %failed_in,
                    code = err.code(),
                    "Deployment failed: {}",
                    err
                );
                log.error(&format!("deployment failed while {}: {}", failed_in, err));
                DeployResult::failure(err, failed_in, elapsed)
            }
        }
    }

    async fn run(&self, request: &DeployRequest, tracker: &mut PhaseTracker<'_>) -> Result<()> {
        request.validate()?;

        // "Web" と "web" は同じ compose プロジェクトになるため、プロジェクト名で直列化する
        let project = project_name(&request.service_name);
        let _lease = self.lock_project(&project).await;

        tracker.enter(DeployPhase::Staging);
        let staged = self.stage(request).await?;
        tracker.log.info(&format!(
            "staged {} and {}",
            staged.manifest_path.display(),
            staged.env_path.display()
        ));

        for step in LifecycleCommand::SEQUENCE {
            tracker.enter(phase_for(step));
            self.run_step(step, &project, &staged, tracker.log).await?;
        }

        Ok(())
    }

    /// マニフェストを先にデコードするため、壊れた入力ではディスクに一切触れない
    async fn stage(&self, request: &DeployRequest) -> Result<StagedFiles> {
        let manifest = Manifest::decode(&request.manifest)?;
        tracing::debug!(
            service = %request.service_name,
            "Manifest services: {:?}",
            manifest.service_names()
        );

        let staged = self
            .staging
            .stage(&request.service_name, &manifest, &request.env_file)
            .await?;
        Ok(staged)
    }

    async fn run_step(
        &self,
        step: LifecycleCommand,
        project: &str,
        staged: &StagedFiles,
        log: &dyn DeployLog,
    ) -> Result<()> {
        let argv = step.argv(&self.config.docker_binary, project, staged);
        log.info(&format!("$ {}", argv.join(" ")));

        let outcome = self
            .runner
            .run(&argv, self.config.command_timeout)
            .await
            .map_err(|err| match err {
                ProcessError::Timeout { timeout, .. } => {
                    DeployError::ProcessTimeout { step, timeout }
                }
                other => DeployError::ProcessLaunch {
                    step,
                    source: other,
                },
            })?;

        // 成否に関わらず両方のストリームを残す
        if !outcome.stdout.is_empty() {
            log.info(&outcome.stdout_lossy());
        }
        if !outcome.stderr.is_empty() {
            log.info(&outcome.stderr_lossy());
        }

        if !outcome.success() {
            return Err(DeployError::ProcessExit {
                step,
                exit_code: outcome.exit_code,
                stdout: outcome.stdout_lossy(),
                stderr: outcome.stderr_lossy(),
            });
        }

        tracing::info!(project, "{} completed", step);
        Ok(())
    }

    async fn lock_project(&self, project: &str) -> ProjectLease<'_> {
        let lock = {
            let mut locks = self
                .service_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(project.to_string()).or_default().clone()
        };

        ProjectLease {
            locks: &self.service_locks,
            project: project.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// ロックのエントリを保持しているプロジェクト数
    pub fn tracked_projects(&self) -> usize {
        self.service_locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }
}

/// プロジェクトロックの保持期間。drop 時に待ち手がいなければエントリを消す
struct ProjectLease<'a> {
    locks: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    project: String,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for ProjectLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // 待ち手は map のロック下で Arc を複製するので、ここで 1 なら誰も使っていない
        if locks
            .get(&self.project)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.project);
        }
    }
}

fn phase_for(step: LifecycleCommand) -> DeployPhase {
    match step {
        LifecycleCommand::Down => DeployPhase::Stopping,
        LifecycleCommand::Pull => DeployPhase::Pulling,
        LifecycleCommand::Up => DeployPhase::Starting,
    }
}
