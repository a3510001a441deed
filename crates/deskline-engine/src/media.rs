// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media attachments and their purge at closure.

use deskline_core::{
    AgentContext, BlobDeletion, BlobRef, ConversationId, ConversationStatus, DesklineError,
    MediaKind, Message, MessagePayload,
};
use tracing::{debug, info, warn};

use crate::desk::Desk;
use crate::retry::retry_idempotent;

/// Tally of one purge run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: usize,
    /// Blobs that were already gone.
    pub missing: usize,
    /// Blobs left orphaned after retries ran out.
    pub failed: Vec<BlobRef>,
}

impl PurgeReport {
    pub fn attempted(&self) -> usize {
        self.deleted + self.missing + self.failed.len()
    }

    pub(crate) fn merge(&mut self, other: PurgeReport) {
        self.deleted += other.deleted;
        self.missing += other.missing;
        self.failed.extend(other.failed);
    }
}

impl Desk {
    /// Logs a media entry for a blob the upload side has already written.
    pub async fn attach_media(
        &self,
        id: &ConversationId,
        ctx: &AgentContext,
        blob: BlobRef,
        kind: MediaKind,
        file_name: impl Into<String>,
    ) -> Result<Message, DesklineError> {
        let payload = MessagePayload::Media {
            url: blob,
            kind,
            file_name: file_name.into(),
        };
        self.append(id, ctx, payload).await
    }

    /// Guard for the standalone purge entry point.
    ///
    /// Purging happens once, inside [`Desk::close`]. On a closed conversation
    /// this is a no-op returning an empty report; on any other status it
    /// refuses with `InvalidTransition` and deletes nothing.
    pub async fn purge_all(&self, id: &ConversationId) -> Result<PurgeReport, DesklineError> {
        let conversation = self.conversation(id).await?;
        match conversation.status {
            ConversationStatus::Closed => {
                debug!(conversation_id = %id, "purge skipped, already closed");
                Ok(PurgeReport::default())
            }
            from => Err(DesklineError::InvalidTransition {
                from,
                to: ConversationStatus::Closed,
            }),
        }
    }

    /// Deletes the blobs referenced by `messages`. Never fails: per-blob
    /// failures are retried, then logged and counted.
    pub(crate) async fn purge_messages(
        &self,
        id: &ConversationId,
        messages: &[Message],
    ) -> PurgeReport {
        let mut report = PurgeReport::default();
        for blob in messages.iter().filter_map(|m| m.payload.media_ref()) {
            report.merge(self.purge_blob(id, blob).await);
        }
        if report.attempted() > 0 {
            info!(
                conversation_id = %id,
                deleted = report.deleted,
                missing = report.missing,
                failed = report.failed.len(),
                "media purged"
            );
        }
        report
    }

    async fn purge_blob(&self, id: &ConversationId, blob: &BlobRef) -> PurgeReport {
        let mut report = PurgeReport::default();
        let result = retry_idempotent(&self.settings.retry, "blob_delete", || {
            self.blobs.delete(blob)
        })
        .await;
        match result {
            Ok(BlobDeletion::Deleted) => report.deleted += 1,
            Ok(BlobDeletion::NotFound) => {
                debug!(conversation_id = %id, blob = %blob, "blob already gone");
                report.missing += 1;
            }
            Err(e) => {
                warn!(conversation_id = %id, blob = %blob, error = %e, "blob deletion failed, orphaned");
                report.failed.push(blob.clone());
            }
        }
        report
    }
}
