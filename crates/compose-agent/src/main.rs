use anyhow::Result;
use clap::Parser;
use compose_agent::registry;
use compose_agent_config::{AgentConfig, CONFIG_PATH_ENV};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "compose-agent")]
#[command(about = "docker compose のデプロイを gRPC で受け付けるエージェント", long_about = None)]
#[command(version)]
struct Cli {
    /// 設定ファイル（未指定なら自動検出）
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// 待ち受けアドレス
    #[arg(long, env = "COMPOSE_AGENT_LISTEN")]
    listen: Option<SocketAddr>,

    /// ステージングのルートディレクトリ
    #[arg(long)]
    staging_root: Option<PathBuf>,

    /// サービスごとのログを置くディレクトリ
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// compose を提供するバイナリ
    #[arg(long)]
    docker_binary: Option<String>,

    /// 1コマンドあたりのタイムアウト秒数（0 で無制限）
    #[arg(long)]
    command_timeout: Option<u64>,

    /// 同時に処理するデプロイの上限
    #[arg(long)]
    max_concurrent_deploys: Option<usize>,

    /// 起動時の docker login を行わない
    #[arg(long)]
    skip_login: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(root) = &self.staging_root {
            config.staging_root = root.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        if let Some(binary) = &self.docker_binary {
            config.docker_binary = binary.clone();
        }
        if let Some(secs) = self.command_timeout {
            config.command_timeout_secs = secs;
        }
        if let Some(max) = self.max_concurrent_deploys {
            config.max_concurrent_deploys = max;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("compose_agent=info,info")),
        )
        .init();

    // --config / COMPOSE_AGENT_CONFIG があればそのファイルだけを読む
    let mut config = match &cli.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::discover()?,
    };
    cli.apply_overrides(&mut config);
    config.validate()?;

    if !cli.skip_login {
        registry::login_from_env(&config.docker_binary).await;
    }

    compose_agent::serve(&config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    })
    .await
}
