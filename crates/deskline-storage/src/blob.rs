// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem-backed blob store for media attachments.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use deskline_config::model::MediaConfig;
use deskline_core::{Adapter, AdapterType, BlobDeletion, BlobRef, BlobStore, DesklineError, HealthStatus};

/// Stores each blob as a file under a root directory; a [`BlobRef`] is the
/// path relative to that root.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self::with_root(&config.root_dir)
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a reference to a path, refusing anything that escapes the root.
    fn resolve(&self, blob: &BlobRef) -> Result<PathBuf, DesklineError> {
        let rel = Path::new(blob.as_str());
        let escapes = rel.as_os_str().is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(DesklineError::Validation(format!("invalid blob reference: {blob}")));
        }
        Ok(self.root.join(rel))
    }

    /// Writes a blob. The upload side of the media flow; the engine only deletes.
    pub async fn write(&self, blob: &BlobRef, bytes: &[u8]) -> Result<(), DesklineError> {
        let path = self.resolve(blob)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(DesklineError::storage)?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(DesklineError::storage)
    }

    pub async fn exists(&self, blob: &BlobRef) -> Result<bool, DesklineError> {
        let path = self.resolve(blob)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(DesklineError::storage)
    }
}

#[async_trait]
impl Adapter for FsBlobStore {
    fn name(&self) -> &str {
        "fs-blob"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, DesklineError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(e) => Ok(HealthStatus::Degraded(format!(
                "media root unavailable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), DesklineError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn delete(&self, blob: &BlobRef) -> Result<BlobDeletion, DesklineError> {
        let path = self.resolve(blob)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(blob = %blob, "blob deleted");
                Ok(BlobDeletion::Deleted)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BlobDeletion::NotFound),
            Err(e) => Err(DesklineError::storage(e)),
        }
    }
}
