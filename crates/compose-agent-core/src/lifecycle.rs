//! docker compose のライフサイクルコマンド
//!
//! デプロイは常に Down → Pull → Up の順で実行されます。

use crate::staging::StagedFiles;
use std::fmt;

/// 1回のデプロイで実行する外部コマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleCommand {
    /// 既存スタックの停止
    Down,
    /// イメージの強制pull
    Pull,
    /// 新しいスタックの起動（デタッチ）
    Up,
}

impl LifecycleCommand {
    /// 実行順
    pub const SEQUENCE: [LifecycleCommand; 3] = [
        LifecycleCommand::Down,
        LifecycleCommand::Pull,
        LifecycleCommand::Up,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleCommand::Down => "down",
            LifecycleCommand::Pull => "pull",
            LifecycleCommand::Up => "up",
        }
    }

    /// コマンドライン全体を組み立てる
    ///
    /// Down はまだ新しい env ファイルを必要としないため `--env-file` を付けない。
    pub fn argv(&self, docker_binary: &str, project: &str, staged: &StagedFiles) -> Vec<String> {
        let mut argv = vec![
            docker_binary.to_string(),
            "compose".to_string(),
            "-p".to_string(),
            project.to_string(),
        ];

        if *self != LifecycleCommand::Down {
            argv.push("--env-file".to_string());
            argv.push(staged.env_path.display().to_string());
        }

        argv.push("-f".to_string());
        argv.push(staged.manifest_path.display().to_string());
        argv.push(self.as_str().to_string());

        if *self == LifecycleCommand::Up {
            argv.push("-d".to_string());
        }

        argv
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "docker compose {}", self.as_str())
    }
}

/// サービス名から compose のプロジェクト名を作る
///
/// compose は小文字英数字・`-`・`_` のみ受け付け、先頭は英数字でなければならない。
pub fn project_name(service_name: &str) -> String {
    let mut name: String = service_name
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        name.insert(0, 's');
    }

    name
}
