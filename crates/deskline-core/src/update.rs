// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conditional-update vocabulary shared by every document store.
//!
//! A store applies a [`ConversationPatch`] only while the stored document
//! still satisfies the accompanying [`Precondition`]; check and write happen
//! as one atomic step inside the store. This is the single primitive the
//! claim protocol relies on for linearizable status/owner changes.

use chrono::{DateTime, Utc};

use crate::types::{
    AgentContext, AgentId, ClosingFeedback, Conversation, ConversationStatus, IntakeFields,
    LastMessageSummary,
};

/// Expected state of a conversation document at write time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    statuses: Option<Vec<ConversationStatus>>,
    owner: Option<Option<AgentId>>,
}

impl Precondition {
    /// Matches any document.
    pub fn any() -> Self {
        Self::default()
    }

    /// Requires the current status to be one of `statuses`.
    pub fn status_in(mut self, statuses: &[ConversationStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    /// Requires the current owner to equal `owner` (`None` means unowned).
    pub fn owned_by(mut self, owner: Option<&AgentId>) -> Self {
        self.owner = Some(owner.cloned());
        self
    }

    pub fn matches(&self, conversation: &Conversation) -> bool {
        if let Some(statuses) = &self.statuses
            && !statuses.contains(&conversation.status)
        {
            return false;
        }
        if let Some(owner) = &self.owner
            && conversation.owner_agent_id.as_ref() != owner.as_ref()
        {
            return false;
        }
        true
    }
}

/// Field changes applied atomically by a conditional update.
///
/// `None` leaves a field untouched. Timestamps and closing feedback are
/// set-once: a patch never overwrites a value that is already present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationPatch {
    pub status: Option<ConversationStatus>,
    pub owner_agent_id: Option<Option<AgentId>>,
    pub add_grantee: Option<String>,
    pub clear_shared: bool,
    pub intake: Option<IntakeFields>,
    pub customer_name: Option<String>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closing_feedback: Option<ClosingFeedback>,
    pub closing_warning_sent: Option<bool>,
    pub unread_by_agent: Option<bool>,
    pub last_message: Option<LastMessageSummary>,
}

impl ConversationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the status change carried by the patch, if any, is an
    /// allowed lifecycle edge from `current`. Stores refuse the rest.
    pub fn permits(&self, current: &Conversation) -> bool {
        self.status
            .is_none_or(|next| current.status.can_transition_to(next))
    }

    /// Applies the patch in place, bumping `revision` and `updated_at`.
    pub fn apply(&self, conversation: &mut Conversation, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            conversation.status = status;
        }
        if let Some(owner) = &self.owner_agent_id {
            conversation.owner_agent_id = owner.clone();
        }
        if self.clear_shared {
            conversation.shared_with.clear();
        }
        if let Some(grantee) = &self.add_grantee {
            conversation.shared_with.insert(grantee.clone());
        }
        if let Some(intake) = &self.intake {
            conversation.intake = Some(intake.clone());
        }
        if let Some(name) = &self.customer_name {
            conversation.customer_name = name.clone();
        }
        set_once(&mut conversation.queued_at, self.queued_at);
        set_once(&mut conversation.started_at, self.started_at);
        set_once(&mut conversation.closed_at, self.closed_at);
        if conversation.closing_feedback.is_none()
            && let Some(feedback) = &self.closing_feedback
        {
            conversation.closing_feedback = Some(feedback.clone());
        }
        if let Some(flag) = self.closing_warning_sent {
            conversation.closing_warning_sent = flag;
        }
        if let Some(flag) = self.unread_by_agent {
            conversation.unread_by_agent = flag;
        }
        if let Some(summary) = &self.last_message {
            // A late summary write must not replace a newer one.
            let newer = conversation
                .last_message
                .as_ref()
                .is_none_or(|current| current.timestamp <= summary.timestamp);
            if newer {
                conversation.last_message = Some(summary.clone());
            }
        }
        conversation.revision += 1;
        conversation.updated_at = now;
    }
}

fn set_once(slot: &mut Option<DateTime<Utc>>, value: Option<DateTime<Utc>>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Result of a conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The precondition held; carries the document as written.
    Applied(Conversation),
    /// The precondition did not hold; carries the current document, unchanged.
    PreconditionFailed(Conversation),
}

impl UpdateOutcome {
    pub fn conversation(&self) -> &Conversation {
        match self {
            UpdateOutcome::Applied(c) | UpdateOutcome::PreconditionFailed(c) => c,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }
}

/// Selection of conversations for listing and change subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationQuery {
    /// Empty means every status.
    pub statuses: Vec<ConversationStatus>,
    pub owner: Option<AgentId>,
    /// Owner or share grantee.
    pub participant: Option<AgentContext>,
}

impl ConversationQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: ConversationStatus) -> Self {
        Self {
            statuses: vec![status],
            ..Self::default()
        }
    }

    pub fn owned_by(mut self, owner: AgentId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn involving(mut self, ctx: AgentContext) -> Self {
        self.participant = Some(ctx);
        self
    }

    pub fn matches(&self, conversation: &Conversation) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&conversation.status) {
            return false;
        }
        if let Some(owner) = &self.owner
            && !conversation.is_owned_by(owner)
        {
            return false;
        }
        if let Some(ctx) = &self.participant
            && !conversation.is_participant(ctx)
        {
            return false;
        }
        true
    }
}
