//! デプロイごとの診断ログ
//!
//! グローバルなロガー設定を書き換えず、呼び出しごとにシンクを渡す。

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Dispatch, Level};

/// 1回のデプロイの出力先
pub trait DeployLog: Send + Sync {
    fn record(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.record(Level::INFO, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::ERROR, message);
    }
}

/// `<log_dir>/<service>.log` に追記するシンク
///
/// ファイルごとに専用の fmt サブスクライバを持ち、記録時だけそれを既定にする。
/// プロセス全体の tracing 設定には影響しない。
#[derive(Debug)]
pub struct FileDeployLog {
    path: PathBuf,
    dispatch: Dispatch,
}

impl FileDeployLog {
    /// ログファイルを追記モードで開く（ディレクトリがなければ作成）
    pub fn open(log_dir: &Path, service_name: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("{}.log", service_name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let subscriber = tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_max_level(Level::TRACE)
            .finish();

        Ok(Self {
            path,
            dispatch: Dispatch::new(subscriber),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeployLog for FileDeployLog {
    fn record(&self, level: Level, message: &str) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            for line in message.lines() {
                emit(level, line);
            }
        });
    }
}

/// 現在の既定サブスクライバに1行分のイベントを送る
fn emit(level: Level, line: &str) {
    if level == Level::ERROR {
        tracing::error!("{}", line);
    } else if level == Level::WARN {
        tracing::warn!("{}", line);
    } else if level == Level::INFO {
        tracing::info!("{}", line);
    } else if level == Level::DEBUG {
        tracing::debug!("{}", line);
    } else {
        tracing::trace!("{}", line);
    }
}

/// メモリに保持するシンク（テスト・診断用）
#[derive(Debug, Default)]
pub struct MemoryDeployLog {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryDeployLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl DeployLog for MemoryDeployLog {
    fn record(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

/// 何も記録しないシンク
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDeployLog;

impl DeployLog for NullDeployLog {
    fn record(&self, _level: Level, _message: &str) {}
}
