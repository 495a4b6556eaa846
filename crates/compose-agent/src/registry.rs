//! 起動時のレジストリログイン

use anyhow::{Context, Result, bail};
use compose_agent_config::RegistryCredentials;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// `docker login` の引数（トークンは含めない）
pub fn login_argv(docker_binary: &str, creds: &RegistryCredentials) -> Vec<String> {
    vec![
        docker_binary.to_string(),
        "login".to_string(),
        "--username".to_string(),
        creds.username.clone(),
        "--password-stdin".to_string(),
        creds.url.clone(),
    ]
}

/// トークンを stdin で渡して `docker login` を実行
pub async fn docker_login(docker_binary: &str, creds: &RegistryCredentials) -> Result<()> {
    let argv = login_argv(docker_binary, creds);

    let mut child = Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to run {} login", docker_binary))?;

    // トークンを stdin に渡す（閉じると EOF になる）
    if let Some(mut stdin) = child.stdin.take()
        && let Err(e) = stdin.write_all(creds.token.as_bytes()).await
    {
        tracing::debug!("Failed to write registry token to stdin: {}", e);
    }

    let output = child
        .wait_with_output()
        .await
        .context("docker login did not complete")?;

    if !output.status.success() {
        bail!(
            "docker login to {} failed: {}",
            creds.url,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    tracing::info!(registry = %creds.url, username = %creds.username, "Logged in to registry");
    Ok(())
}

/// 環境変数に認証情報があればログインする
///
/// 失敗してもエージェントは起動を続ける。pull 時に同じエラーが表面化する。
pub async fn login_from_env(docker_binary: &str) -> bool {
    let Some(creds) = RegistryCredentials::from_env() else {
        tracing::info!("Registry credentials not set, skipping docker login");
        return false;
    };

    match docker_login(docker_binary, &creds).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("{:#}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> RegistryCredentials {
        RegistryCredentials {
            url: "registry.example.com".to_string(),
            username: "deployer".to_string(),
            token: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_login_argv_keeps_token_off_command_line() {
        let argv = login_argv("docker", &creds());
        assert_eq!(
            argv,
            vec![
                "docker",
                "login",
                "--username",
                "deployer",
                "--password-stdin",
                "registry.example.com"
            ]
        );
        assert!(!argv.iter().any(|a| a.contains("s3cret")));
    }

    #[tokio::test]
    async fn test_docker_login_missing_binary() {
        let result = docker_login("/nonexistent/docker", &creds()).await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_docker_login_writes_token_to_stdin() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let captured = temp_dir.path().join("stdin.txt");
        let fake = temp_dir.path().join("docker");
        std::fs::write(
            &fake,
            format!("#!/bin/sh\ncat > '{}'\n", captured.display()),
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        docker_login(fake.to_str().unwrap(), &creds()).await.unwrap();

        assert_eq!(std::fs::read_to_string(&captured).unwrap(), "s3cret");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_docker_login_reports_failure() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let fake = temp_dir.path().join("docker");
        std::fs::write(&fake, "#!/bin/sh\ncat > /dev/null\necho 'unauthorized' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = docker_login(fake.to_str().unwrap(), &creds())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
    }
}
