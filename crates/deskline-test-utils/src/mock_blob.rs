// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock blob store for deterministic testing.
//!
//! `MockBlobStore` keeps a set of existing blob references, records every
//! deletion attempt, and can be told to fail deletions of chosen blobs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use deskline_core::{
    Adapter, AdapterType, BlobDeletion, BlobRef, BlobStore, DesklineError, HealthStatus,
};

#[derive(Default)]
struct Inner {
    present: HashSet<BlobRef>,
    attempts: Vec<BlobRef>,
    /// Remaining forced failures per blob; `usize::MAX` fails forever.
    failures: HashMap<BlobRef, usize>,
}

/// A blob store that lives in memory and remembers what was asked of it.
#[derive(Default)]
pub struct MockBlobStore {
    inner: Mutex<Inner>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretends the upload side wrote `blob`.
    pub async fn put(&self, blob: impl Into<BlobRef>) -> BlobRef {
        let blob = blob.into();
        self.inner.lock().await.present.insert(blob.clone());
        blob
    }

    pub async fn contains(&self, blob: &BlobRef) -> bool {
        self.inner.lock().await.present.contains(blob)
    }

    /// Every deletion attempt, retries included, in call order.
    pub async fn delete_attempts(&self) -> Vec<BlobRef> {
        self.inner.lock().await.attempts.clone()
    }

    /// Makes the next `times` deletions of `blob` fail with a transient error.
    pub async fn fail_deletes(&self, blob: &BlobRef, times: usize) {
        self.inner.lock().await.failures.insert(blob.clone(), times);
    }

    /// Makes every deletion of `blob` fail.
    pub async fn fail_always(&self, blob: &BlobRef) {
        self.fail_deletes(blob, usize::MAX).await;
    }
}

#[async_trait]
impl Adapter for MockBlobStore {
    fn name(&self) -> &str {
        "mock-blob"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::BlobStore
    }

    async fn health_check(&self) -> Result<HealthStatus, DesklineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DesklineError> {
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn delete(&self, blob: &BlobRef) -> Result<BlobDeletion, DesklineError> {
        let mut inner = self.inner.lock().await;
        inner.attempts.push(blob.clone());
        if let Some(remaining) = inner.failures.get_mut(blob)
            && *remaining > 0
        {
            if *remaining != usize::MAX {
                *remaining -= 1;
            }
            return Err(DesklineError::storage(format!("mock failure deleting {blob}")));
        }
        if inner.present.remove(blob) {
            Ok(BlobDeletion::Deleted)
        } else {
            Ok(BlobDeletion::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_attempts_and_injected_failures() {
        let store = MockBlobStore::new();
        let blob = store.put("a.jpg").await;
        store.fail_deletes(&blob, 1).await;

        assert!(store.delete(&blob).await.is_err());
        assert_eq!(store.delete(&blob).await.unwrap(), BlobDeletion::Deleted);
        assert_eq!(store.delete(&blob).await.unwrap(), BlobDeletion::NotFound);
        assert_eq!(store.delete_attempts().await.len(), 3);
    }
}
