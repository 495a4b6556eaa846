use crate::lifecycle::LifecycleCommand;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// マニフェストのデコードエラー
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("manifest is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("manifest is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// ステージングディレクトリの操作エラー
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("failed to clear staging directory {}: {source}", path.display())]
    Clear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Encode(#[source] serde_yaml::Error),
}

/// 外部プロセス実行のエラー（非ゼロ終了はエラーではなく ProcessOutcome で返る）
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not exit within {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

/// デプロイ1回分を終了させるエラー
///
/// どの種類も再試行されず、ロールバックも行われない。
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("{step} could not be started: {source}")]
    ProcessLaunch {
        step: LifecycleCommand,
        #[source]
        source: ProcessError,
    },

    #[error("{step} exited with {}", exit_label(.exit_code))]
    ProcessExit {
        step: LifecycleCommand,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("{step} timed out after {}s", timeout.as_secs())]
    ProcessTimeout {
        step: LifecycleCommand,
        timeout: Duration,
    },

    #[error("deployment aborted: {0}")]
    Aborted(String),
}

impl DeployError {
    /// 呼び出し側が種類で分岐するための安定したコード
    pub fn code(&self) -> &'static str {
        match self {
            DeployError::InvalidRequest(_) => "invalid_request",
            DeployError::Decode(_) => "decode",
            DeployError::Staging(_) => "staging",
            DeployError::ProcessLaunch { .. } => "process_launch",
            DeployError::ProcessExit { .. } => "process_exit",
            DeployError::ProcessTimeout { .. } => "process_timeout",
            DeployError::Aborted(_) => "aborted",
        }
    }

    /// 失敗したライフサイクルステップ（ステージング前の失敗なら None）
    pub fn step(&self) -> Option<LifecycleCommand> {
        match self {
            DeployError::ProcessLaunch { step, .. }
            | DeployError::ProcessExit { step, .. }
            | DeployError::ProcessTimeout { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
