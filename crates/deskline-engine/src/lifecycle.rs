// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine: intake, in-place edits, closing warning, closure.
//!
//! ```text
//! pending_intake --submit_intake--> queued
//! pending_intake | queued --claim--> active --close--> closed
//! ```
//!
//! Claims live in [`crate::claim`]; everything else that moves a
//! conversation along is here.

use chrono::Utc;
use deskline_core::{
    AgentContext, ClosingFeedback, Conversation, ConversationId, ConversationPatch,
    ConversationStatus, DesklineError, IntakeFields, LastMessageSummary,
    Message, MessagePayload, NewMessage, Notice, Precondition, Sender, UpdateOutcome,
};
use tracing::{debug, info};

use crate::claim::authorize_write;
use crate::desk::Desk;
use crate::media::PurgeReport;

/// Result of a close request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// This call moved the conversation to `closed`.
    Closed {
        conversation: Conversation,
        purge: PurgeReport,
    },
    /// It was already closed; nothing was purged or written.
    AlreadyClosed(Conversation),
}

impl CloseOutcome {
    pub fn conversation(&self) -> &Conversation {
        match self {
            CloseOutcome::Closed { conversation, .. } | CloseOutcome::AlreadyClosed(conversation) => {
                conversation
            }
        }
    }
}

impl Desk {
    /// Creates a conversation awaiting intake data.
    pub async fn open_conversation(
        &self,
        customer_id: &str,
        customer_name: &str,
    ) -> Result<Conversation, DesklineError> {
        if customer_id.trim().is_empty() {
            return Err(DesklineError::Validation("customer id is empty".into()));
        }
        let conversation = Conversation::new_pending(customer_id, customer_name, Utc::now());
        self.store.insert_conversation(&conversation).await?;
        info!(conversation_id = %conversation.id, customer_id, "conversation opened");
        Ok(conversation)
    }

    /// Records the customer's intake form and queues the conversation.
    pub async fn submit_intake(
        &self,
        id: &ConversationId,
        intake: IntakeFields,
    ) -> Result<Conversation, DesklineError> {
        validate_intake(&intake)?;
        let expected = Precondition::any().status_in(&[ConversationStatus::PendingIntake]);
        let patch = ConversationPatch {
            status: Some(ConversationStatus::Queued),
            queued_at: Some(Utc::now()),
            customer_name: Some(intake.name.clone()),
            intake: Some(intake),
            ..ConversationPatch::default()
        };
        match self.store.conditional_update(id, &expected, &patch).await? {
            UpdateOutcome::Applied(conversation) => {
                info!(conversation_id = %id, "conversation queued");
                Ok(conversation)
            }
            UpdateOutcome::PreconditionFailed(current) => Err(DesklineError::InvalidTransition {
                from: current.status,
                to: ConversationStatus::Queued,
            }),
        }
    }

    /// Appends a customer-authored text entry and flags the conversation unread.
    ///
    /// Allowed in every open status; only the conversation's own customer may write.
    pub async fn append_customer(
        &self,
        id: &ConversationId,
        customer_id: &str,
        text: impl Into<String>,
    ) -> Result<Message, DesklineError> {
        let conversation = self.conversation(id).await?;
        if conversation.customer_id != customer_id {
            return Err(DesklineError::AccessDenied {
                agent: customer_id.to_string(),
                conversation: id.to_string(),
            });
        }
        if conversation.status.is_terminal() {
            return Err(DesklineError::ConversationClosed { id: id.to_string() });
        }
        let message = NewMessage::new(
            id.clone(),
            Sender::Customer(customer_id.to_string()),
            MessagePayload::text(text),
        );
        self.append_and_summarize(message, Some(true)).await
    }

    /// Replaces the intake record. Requires the access predicate.
    pub async fn update_intake(
        &self,
        id: &ConversationId,
        ctx: &AgentContext,
        intake: IntakeFields,
    ) -> Result<Conversation, DesklineError> {
        validate_intake(&intake)?;
        let current = self.conversation(id).await?;
        authorize_write(&current, ctx)?;

        let patch = ConversationPatch {
            customer_name: Some(intake.name.clone()),
            intake: Some(intake),
            ..ConversationPatch::default()
        };
        self.write_while_active(&current, ctx, &patch).await
    }

    /// Warns the customer that closure is near and records that the warning went out.
    pub async fn send_closing_warning(
        &self,
        id: &ConversationId,
        ctx: &AgentContext,
    ) -> Result<Conversation, DesklineError> {
        let current = self.conversation(id).await?;
        authorize_write(&current, ctx)?;

        let message = NewMessage::new(
            id.clone(),
            Sender::Agent(ctx.agent_id.clone()),
            MessagePayload::text(self.settings.messages.closing_warning_text.clone()),
        )
        .with_notice(Notice::ClosingWarning);
        self.append_and_summarize(message, Some(false)).await?;

        let patch = ConversationPatch {
            closing_warning_sent: Some(true),
            ..ConversationPatch::default()
        };
        self.write_while_active(&current, ctx, &patch).await
    }

    /// Closes a conversation on behalf of its owner.
    ///
    /// Purges media, appends the closing notice, then records feedback and
    /// clears ownership and grants in one conditional write. Safe to call
    /// again after a partial failure: blob deletion is idempotent, the notice
    /// is written once, and a closed conversation is left untouched.
    pub async fn close(
        &self,
        id: &ConversationId,
        ctx: &AgentContext,
        feedback: ClosingFeedback,
    ) -> Result<CloseOutcome, DesklineError> {
        let current = self.conversation(id).await?;
        match current.status {
            ConversationStatus::Closed => return Ok(CloseOutcome::AlreadyClosed(current)),
            ConversationStatus::Active => {}
            from => {
                return Err(DesklineError::InvalidTransition {
                    from,
                    to: ConversationStatus::Closed,
                });
            }
        }
        if !current.is_owned_by(&ctx.agent_id) {
            return Err(not_owner(ctx, id));
        }

        let messages = self.store.list_messages(id, None).await?;
        let mut purge = self.purge_messages(id, &messages).await;

        let closing_text = self.settings.messages.closing_text.clone();
        let notice = match messages.iter().find(|m| m.notice == Some(Notice::Closing)) {
            Some(existing) => existing.clone(),
            None => self.append_system(id, Notice::Closing, closing_text.clone()).await?,
        };

        let expected = Precondition::any()
            .status_in(&[ConversationStatus::Active])
            .owned_by(Some(&ctx.agent_id));
        let patch = ConversationPatch {
            status: Some(ConversationStatus::Closed),
            owner_agent_id: Some(None),
            clear_shared: true,
            closed_at: Some(Utc::now()),
            closing_feedback: Some(feedback),
            unread_by_agent: Some(false),
            last_message: Some(LastMessageSummary {
                text: closing_text,
                timestamp: notice.timestamp,
            }),
            ..ConversationPatch::default()
        };
        let closed = match self.store.conditional_update(id, &expected, &patch).await? {
            UpdateOutcome::Applied(conversation) => conversation,
            UpdateOutcome::PreconditionFailed(now) if now.status.is_terminal() => {
                return Ok(CloseOutcome::AlreadyClosed(now));
            }
            UpdateOutcome::PreconditionFailed(_) => return Err(not_owner(ctx, id)),
        };

        // Entries that slipped in between the first listing and the final
        // write are frozen now; sweep their media too.
        let last_seen = messages.last().map(|m| m.seq).max(Some(notice.seq));
        let late = self.store.list_messages(id, last_seen).await?;
        if !late.is_empty() {
            debug!(conversation_id = %id, count = late.len(), "sweeping late entries");
            purge.merge(self.purge_messages(id, &late).await);
        }

        info!(
            conversation_id = %id,
            agent_id = %ctx.agent_id,
            handling_secs = closed.handling_time().map(|d| d.num_seconds()),
            "conversation closed"
        );
        Ok(CloseOutcome::Closed {
            conversation: closed,
            purge,
        })
    }

    /// Applies an in-place edit if the conversation is still active under the
    /// same owner as when access was checked.
    async fn write_while_active(
        &self,
        checked: &Conversation,
        ctx: &AgentContext,
        patch: &ConversationPatch,
    ) -> Result<Conversation, DesklineError> {
        let expected = Precondition::any()
            .status_in(&[ConversationStatus::Active])
            .owned_by(checked.owner_agent_id.as_ref());
        match self
            .store
            .conditional_update(&checked.id, &expected, patch)
            .await?
        {
            UpdateOutcome::Applied(conversation) => Ok(conversation),
            UpdateOutcome::PreconditionFailed(now) => {
                authorize_write(&now, ctx)?;
                Err(DesklineError::PreconditionFailed {
                    id: checked.id.to_string(),
                })
            }
        }
    }
}

fn not_owner(ctx: &AgentContext, id: &ConversationId) -> DesklineError {
    DesklineError::NotOwner {
        agent: ctx.agent_id.to_string(),
        conversation: id.to_string(),
    }
}

fn validate_intake(intake: &IntakeFields) -> Result<(), DesklineError> {
    let required = [
        ("name", &intake.name),
        ("service option", &intake.service_option),
        ("communication mode", &intake.comm_mode),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(DesklineError::Validation(format!("intake {field} is required")));
    }
    Ok(())
}
