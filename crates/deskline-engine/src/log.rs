// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log appends and the denormalized last-message summary.
//!
//! The log itself is strongly ordered by the store. The summary on the
//! conversation document is a best-effort cache: a failed summary write
//! never fails the append that triggered it.

use chrono::{DateTime, Utc};
use deskline_core::{
    AgentContext, ConversationId, ConversationPatch, ConversationStatus, DesklineError,
    LastMessageSummary, MediaKind, Message, MessagePayload, NewMessage, Notice, Precondition,
    Sender,
};
use tracing::{debug, warn};

use crate::claim::authorize_write;
use crate::desk::Desk;

impl Desk {
    /// Appends an agent-authored entry. Requires the access predicate.
    pub async fn append(
        &self,
        id: &ConversationId,
        ctx: &AgentContext,
        payload: MessagePayload,
    ) -> Result<Message, DesklineError> {
        let conversation = self.conversation(id).await?;
        authorize_write(&conversation, ctx)?;

        let message = NewMessage::new(id.clone(), Sender::Agent(ctx.agent_id.clone()), payload);
        self.append_and_summarize(message, Some(false)).await
    }

    /// Appends a text entry on behalf of `ctx`.
    pub async fn send_text(
        &self,
        id: &ConversationId,
        ctx: &AgentContext,
        text: impl Into<String>,
    ) -> Result<Message, DesklineError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DesklineError::Validation("message text is empty".into()));
        }
        self.append(id, ctx, MessagePayload::text(text)).await
    }

    /// Appends a system-authored entry, bypassing the access predicate.
    ///
    /// Closed conversations still reject it.
    pub(crate) async fn append_system(
        &self,
        id: &ConversationId,
        notice: Notice,
        text: String,
    ) -> Result<Message, DesklineError> {
        let message =
            NewMessage::new(id.clone(), Sender::System, MessagePayload::text(text)).with_notice(notice);
        self.store.append_message(message).await
    }

    /// Stores `message`, then mirrors it into the conversation summary.
    pub(crate) async fn append_and_summarize(
        &self,
        message: NewMessage,
        unread_by_agent: Option<bool>,
    ) -> Result<Message, DesklineError> {
        let stored = self.store.append_message(message).await?;
        debug!(
            conversation_id = %stored.conversation_id,
            seq = stored.seq,
            sender = stored.sender.kind(),
            "message appended"
        );
        let text = self.summary_text(&stored.payload);
        self.update_summary(&stored.conversation_id, text, stored.timestamp, unread_by_agent)
            .await;
        Ok(stored)
    }

    /// Best-effort write of the last-message cache on an open conversation.
    pub(crate) async fn update_summary(
        &self,
        id: &ConversationId,
        text: String,
        timestamp: DateTime<Utc>,
        unread_by_agent: Option<bool>,
    ) {
        let patch = ConversationPatch {
            last_message: Some(LastMessageSummary { text, timestamp }),
            unread_by_agent,
            ..ConversationPatch::default()
        };
        let expected = Precondition::any().status_in(&ConversationStatus::OPEN);
        match self.store.conditional_update(id, &expected, &patch).await {
            Ok(outcome) if outcome.is_applied() => {}
            Ok(_) => debug!(conversation_id = %id, "summary skipped, conversation closed"),
            Err(e) => warn!(conversation_id = %id, error = %e, "summary update failed"),
        }
    }

    fn summary_text(&self, payload: &MessagePayload) -> String {
        let messages = &self.settings.messages;
        match payload {
            MessagePayload::Text { text } => text.clone(),
            MessagePayload::Media {
                kind: MediaKind::Audio,
                ..
            } => messages.audio_summary.clone(),
            MessagePayload::Media { .. } => messages.media_summary.clone(),
        }
    }
}

