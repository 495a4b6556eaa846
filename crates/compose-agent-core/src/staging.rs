//! Staging area for the files consumed by the lifecycle commands.
//!
//! Each service owns `<root>/<service>/`, holding exactly a manifest and an
//! env file after a successful [`StagingArea::stage`]. The files stay on disk
//! after the attempt and are cleared by the next attempt for that service.

use crate::error::StagingError;
use crate::manifest::Manifest;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const MANIFEST_FILE: &str = "docker-compose.yml";
pub const ENV_FILE: &str = "tmp.env";

/// Paths of one staged deployment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFiles {
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub env_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staging directory of a service. The name must already be validated.
    pub fn dir_for(&self, service_name: &str) -> PathBuf {
        self.root.join(service_name)
    }

    pub fn files_for(&self, service_name: &str) -> StagedFiles {
        let dir = self.dir_for(service_name);
        StagedFiles {
            manifest_path: dir.join(MANIFEST_FILE),
            env_path: dir.join(ENV_FILE),
            dir,
        }
    }

    /// Remove every entry of the service directory, creating it if missing.
    pub async fn clear(&self, service_name: &str) -> Result<(), StagingError> {
        let dir = self.dir_for(service_name);
        let clear_err = |source: std::io::Error| StagingError::Clear {
            path: dir.clone(),
            source,
        };

        fs::create_dir_all(&dir).await.map_err(clear_err)?;

        let mut entries = fs::read_dir(&dir).await.map_err(clear_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(clear_err)? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(clear_err)?;
            let removed = if file_type.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            removed.map_err(|source| StagingError::Clear { path, source })?;
        }

        tracing::debug!("Cleared staging directory {}", dir.display());
        Ok(())
    }

    pub async fn write_manifest(
        &self,
        service_name: &str,
        manifest: &Manifest,
    ) -> Result<PathBuf, StagingError> {
        let path = self.files_for(service_name).manifest_path;
        let text = manifest.encode()?;
        write_file(&path, text.as_bytes()).await?;
        Ok(path)
    }

    /// The env payload is opaque and written verbatim.
    pub async fn write_env_file(
        &self,
        service_name: &str,
        env_file: &[u8],
    ) -> Result<PathBuf, StagingError> {
        let path = self.files_for(service_name).env_path;
        write_file(&path, env_file).await?;
        Ok(path)
    }

    /// Clear the service directory and write both files.
    pub async fn stage(
        &self,
        service_name: &str,
        manifest: &Manifest,
        env_file: &[u8],
    ) -> Result<StagedFiles, StagingError> {
        self.clear(service_name).await?;
        self.write_manifest(service_name, manifest).await?;
        self.write_env_file(service_name, env_file).await?;
        Ok(self.files_for(service_name))
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), StagingError> {
    fs::write(path, contents)
        .await
        .map_err(|source| StagingError::Write {
            path: path.to_path_buf(),
            source,
        })
}
