// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob store trait for media attachments.

use async_trait::async_trait;

use crate::error::DesklineError;
use crate::traits::adapter::Adapter;
use crate::types::BlobRef;

/// Outcome of a blob deletion. Deleting a missing blob is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobDeletion {
    Deleted,
    NotFound,
}

/// Holds the binary media referenced by log entries.
///
/// Uploads happen outside the core before a media message is attached;
/// the core only ever deletes.
#[async_trait]
pub trait BlobStore: Adapter {
    /// Deletes a blob. Idempotent: a second call reports [`BlobDeletion::NotFound`].
    async fn delete(&self, blob: &BlobRef) -> Result<BlobDeletion, DesklineError>;
}
