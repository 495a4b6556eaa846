pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "COMPOSE_AGENT_CONFIG";

const CONFIG_FILE_NAME: &str = "compose-agent.yml";

pub const REGISTRY_URL_ENV: &str = "DOCKER_REGISTRY_URL";
pub const REGISTRY_USERNAME_ENV: &str = "DOCKER_REGISTRY_USERNAME";
pub const REGISTRY_TOKEN_ENV: &str = "DOCKER_REGISTRY_TOKEN";

/// エージェントの設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// gRPC の待ち受けアドレス
    pub listen_addr: SocketAddr,
    /// ステージングのルート。サービスごとにサブディレクトリが作られる
    pub staging_root: PathBuf,
    /// サービスごとのログファイルを置くディレクトリ
    pub log_dir: PathBuf,
    pub docker_binary: String,
    /// 1コマンドあたりのタイムアウト秒数。0 で無制限
    pub command_timeout_secs: u64,
    /// 同時に処理するデプロイの上限
    pub max_concurrent_deploys: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv6Addr::UNSPECIFIED, 50051)),
            staging_root: PathBuf::from("/agent/tmp"),
            log_dir: PathBuf::from("/agent/logs"),
            docker_binary: "docker".to_string(),
            command_timeout_secs: 600,
            max_concurrent_deploys: 10,
        }
    }
}

impl AgentConfig {
    /// 指定したファイルから読み込む（書かれていない項目はデフォルト値）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::ConfigFileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: AgentConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// 設定ファイルを探して読み込む。見つからなければデフォルト値
    pub fn discover() -> Result<Self> {
        match find_config_file()? {
            Some(path) => Self::load(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_deploys == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_deploys must be at least 1".to_string(),
            ));
        }
        if self.docker_binary.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "docker_binary must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 COMPOSE_AGENT_CONFIG (直接パス指定、存在しなければエラー)
/// 2. カレントディレクトリ: compose-agent.yml
/// 3. ~/.config/compose-agent/config.yml
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    let local = std::env::current_dir()?.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("compose-agent").join("config.yml");
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// レジストリへのログイン情報
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub url: String,
    pub username: String,
    pub token: String,
}

impl RegistryCredentials {
    /// 3つの環境変数がすべて設定されているときだけ Some を返す
    pub fn from_env() -> Option<Self> {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        Some(Self {
            url: read(REGISTRY_URL_ENV)?,
            username: read(REGISTRY_USERNAME_ENV)?,
            token: read(REGISTRY_TOKEN_ENV)?,
        })
    }
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.listen_addr.port(), 50051);
        assert_eq!(config.staging_root, PathBuf::from("/agent/tmp"));
        assert_eq!(config.log_dir, PathBuf::from("/agent/logs"));
        assert_eq!(config.max_concurrent_deploys, 10);
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("agent.yml");
        fs::write(
            &path,
            "listen_addr: 127.0.0.1:6000\nstaging_root: /srv/staging\ncommand_timeout_secs: 0\n",
        )
        .unwrap();

        let config = AgentConfig::load(&path).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:6000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.staging_root, PathBuf::from("/srv/staging"));
        assert_eq!(config.log_dir, PathBuf::from("/agent/logs"));
        assert_eq!(config.command_timeout(), None);
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("agent.yml");
        fs::write(&path, "listen: 1\n").unwrap();

        assert!(matches!(
            AgentConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_rejects_zero_workers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("agent.yml");
        fs::write(&path, "max_concurrent_deploys: 0\n").unwrap();

        assert!(matches!(
            AgentConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yml");
        fs::write(&config_path, "docker_binary: podman\n").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), || {
            assert_eq!(find_config_file().unwrap(), Some(config_path.clone()));
            assert_eq!(AgentConfig::discover().unwrap().docker_binary, "podman");
        });
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var_missing() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/nonexistent/compose-agent.yml"), || {
            assert!(matches!(
                find_config_file(),
                Err(ConfigError::ConfigFileNotFound(_))
            ));
        });
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "log_dir: /tmp/logs\n").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().unwrap().ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    #[serial]
    fn test_registry_credentials_from_env() {
        temp_env::with_vars(
            [
                (REGISTRY_URL_ENV, Some("ghcr.io")),
                (REGISTRY_USERNAME_ENV, Some("deployer")),
                (REGISTRY_TOKEN_ENV, Some("s3cret")),
            ],
            || {
                let creds = RegistryCredentials::from_env().unwrap();
                assert_eq!(creds.url, "ghcr.io");
                assert_eq!(creds.username, "deployer");
                assert!(!format!("{:?}", creds).contains("s3cret"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_registry_credentials_incomplete() {
        temp_env::with_vars(
            [
                (REGISTRY_URL_ENV, Some("ghcr.io")),
                (REGISTRY_USERNAME_ENV, None),
                (REGISTRY_TOKEN_ENV, Some("s3cret")),
            ],
            || {
                assert!(RegistryCredentials::from_env().is_none());
            },
        );
    }
}
