// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim coordination: ownership, capacity admission, and share grants.
//!
//! A claim is one conditional write on the conversation document, expecting
//! `status in {pending_intake, queued}` and no owner. Of several racing
//! claims on one conversation the store lets exactly one through; the others
//! observe the winner and report [`ClaimOutcome::AlreadyOwned`].
//!
//! Capacity is counted and claimed under a per-agent async lock, so one
//! agent's concurrent claims in this process cannot overshoot the limit.
//! Separate processes sharing a store can still overshoot by their number.

use chrono::Utc;
use deskline_core::{
    AgentContext, AgentId, Conversation, ConversationId, ConversationPatch, ConversationQuery,
    ConversationStatus, DesklineError, LastMessageSummary, Notice, Precondition, UpdateOutcome,
};
use tracing::{debug, info, warn};

use crate::desk::Desk;
use crate::welcome;

/// Result of a claim attempt. Every variant except `Claimed` leaves state unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The agent owns the conversation. `resumed` is true when it already did.
    Claimed {
        conversation: Conversation,
        resumed: bool,
    },
    /// Another agent owns it (possibly after winning a race with this call).
    AlreadyOwned { owner: AgentId },
    /// The agent is at its active-conversation limit.
    CapacityExceeded { active: usize, limit: usize },
    /// The conversation is in a status no claim can start from.
    NotClaimable { status: ConversationStatus },
}

impl ClaimOutcome {
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed { .. })
    }

    /// Text suitable for showing to the agent.
    pub fn user_message(&self) -> String {
        match self {
            ClaimOutcome::Claimed { resumed: false, .. } => "Conversation claimed.".into(),
            ClaimOutcome::Claimed { resumed: true, .. } => {
                "You are already handling this conversation.".into()
            }
            ClaimOutcome::AlreadyOwned { .. } => {
                "Another agent has already taken this conversation.".into()
            }
            ClaimOutcome::CapacityExceeded { limit, .. } => format!(
                "You already have {limit} active conversations. Close one before taking another."
            ),
            ClaimOutcome::NotClaimable { status } => {
                format!("This conversation cannot be claimed while {status}.")
            }
        }
    }
}

/// Result of a share request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared(Conversation),
    /// Only the current owner of an active conversation may share it.
    NotOwner,
    /// The grantee already has access; nothing changed.
    AlreadyShared,
}

impl ShareOutcome {
    pub fn user_message(&self) -> String {
        match self {
            ShareOutcome::Shared(_) => "Conversation shared.".into(),
            ShareOutcome::NotOwner => {
                "Only the agent handling this conversation can share it.".into()
            }
            ShareOutcome::AlreadyShared => "That agent already has access.".into(),
        }
    }
}

/// The write access predicate: active, and the agent is owner or grantee.
pub fn authorize_write(conversation: &Conversation, ctx: &AgentContext) -> Result<(), DesklineError> {
    if conversation.status.is_terminal() {
        return Err(DesklineError::ConversationClosed {
            id: conversation.id.to_string(),
        });
    }
    if !conversation.can_write(ctx) {
        return Err(DesklineError::AccessDenied {
            agent: ctx.agent_id.to_string(),
            conversation: conversation.id.to_string(),
        });
    }
    Ok(())
}

impl Desk {
    /// Takes ownership of an unclaimed conversation for `ctx`.
    ///
    /// Claiming a conversation the agent already owns is a no-op that
    /// reports `resumed`, so an ambiguous failure can be retried safely.
    /// Every other attempt is checked against capacity before ownership.
    pub async fn claim(
        &self,
        id: &ConversationId,
        ctx: &AgentContext,
    ) -> Result<ClaimOutcome, DesklineError> {
        let current = self.conversation(id).await?;
        if let Some(outcome @ ClaimOutcome::Claimed { .. }) = settled_claim(&current, &ctx.agent_id)
        {
            return Ok(outcome);
        }

        let lock = self.claim_lock(&ctx.agent_id);
        let guard = lock.lock().await;

        // Capacity first, then ownership: an agent at its limit is told so
        // even when the conversation has meanwhile gone to someone else.
        let limit = self.settings.max_active_per_agent;
        let active = self.active_count(&ctx.agent_id).await?;
        if active >= limit {
            info!(agent_id = %ctx.agent_id, active, limit, "claim rejected, capacity reached");
            return Ok(ClaimOutcome::CapacityExceeded { active, limit });
        }
        if let Some(outcome) = settled_claim(&current, &ctx.agent_id) {
            return Ok(outcome);
        }

        let now = Utc::now();
        let expected = Precondition::any()
            .status_in(&ConversationStatus::CLAIMABLE)
            .owned_by(None);
        let patch = ConversationPatch {
            status: Some(ConversationStatus::Active),
            owner_agent_id: Some(Some(ctx.agent_id.clone())),
            started_at: Some(now),
            closing_warning_sent: Some(false),
            unread_by_agent: Some(false),
            last_message: Some(LastMessageSummary {
                text: self.settings.messages.claim_summary.clone(),
                timestamp: now,
            }),
            ..ConversationPatch::default()
        };

        let claimed = match self.store.conditional_update(id, &expected, &patch).await? {
            UpdateOutcome::Applied(conversation) => conversation,
            UpdateOutcome::PreconditionFailed(current) => {
                drop(guard);
                let outcome = settled_claim(&current, &ctx.agent_id).unwrap_or(
                    ClaimOutcome::NotClaimable {
                        status: current.status,
                    },
                );
                debug!(conversation_id = %id, agent_id = %ctx.agent_id, ?outcome, "claim lost race");
                return Ok(outcome);
            }
        };
        drop(guard);
        info!(conversation_id = %id, agent_id = %ctx.agent_id, "conversation claimed");

        let text = welcome::render(&self.settings.messages.welcome_greeting, &claimed);
        if let Err(e) = self.append_system(id, Notice::Welcome, text).await {
            warn!(conversation_id = %id, error = %e, "welcome message not sent");
        }

        Ok(ClaimOutcome::Claimed {
            conversation: claimed,
            resumed: false,
        })
    }

    /// Grants `grantee` (an agent id or email) write access alongside the owner.
    pub async fn share(
        &self,
        id: &ConversationId,
        ctx: &AgentContext,
        grantee: &str,
    ) -> Result<ShareOutcome, DesklineError> {
        let grantee = grantee.trim();
        if grantee.is_empty() {
            return Err(DesklineError::Validation("share grantee is empty".into()));
        }

        let current = self.conversation(id).await?;
        if current.status != ConversationStatus::Active || !current.is_owned_by(&ctx.agent_id) {
            return Ok(ShareOutcome::NotOwner);
        }
        if ctx.matches_grantee(grantee)
            || current
                .shared_with
                .iter()
                .any(|g| g.eq_ignore_ascii_case(grantee))
        {
            return Ok(ShareOutcome::AlreadyShared);
        }

        let expected = Precondition::any()
            .status_in(&[ConversationStatus::Active])
            .owned_by(Some(&ctx.agent_id));
        let patch = ConversationPatch {
            add_grantee: Some(grantee.to_string()),
            ..ConversationPatch::default()
        };
        let shared = match self.store.conditional_update(id, &expected, &patch).await? {
            UpdateOutcome::Applied(conversation) => conversation,
            UpdateOutcome::PreconditionFailed(_) => return Ok(ShareOutcome::NotOwner),
        };
        info!(conversation_id = %id, agent_id = %ctx.agent_id, grantee, "conversation shared");

        let text = format!("Conversation shared with {grantee}.");
        if let Err(e) = self.append_system(id, Notice::Shared, text).await {
            warn!(conversation_id = %id, error = %e, "share notice not logged");
        }
        Ok(ShareOutcome::Shared(shared))
    }

    /// Number of active conversations `agent` owns.
    pub async fn active_count(&self, agent: &AgentId) -> Result<usize, DesklineError> {
        let query = ConversationQuery::with_status(ConversationStatus::Active).owned_by(agent.clone());
        Ok(self.store.list_conversations(&query).await?.len())
    }
}

/// Outcome for a conversation no claim by `agent` can change.
fn settled_claim(conversation: &Conversation, agent: &AgentId) -> Option<ClaimOutcome> {
    match (conversation.status, &conversation.owner_agent_id) {
        (ConversationStatus::Active, Some(owner)) if owner == agent => {
            Some(ClaimOutcome::Claimed {
                conversation: conversation.clone(),
                resumed: true,
            })
        }
        (ConversationStatus::Active, Some(owner)) => Some(ClaimOutcome::AlreadyOwned {
            owner: owner.clone(),
        }),
        (status, _) if !status.is_claimable() => Some(ClaimOutcome::NotClaimable { status }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(owner: &str) -> Conversation {
        let mut c = Conversation::new_pending("cust", "Ana", Utc::now());
        c.status = ConversationStatus::Active;
        c.owner_agent_id = Some(AgentId::from(owner));
        c
    }

    #[test]
    fn settled_claims() {
        let a = AgentId::from("a");
        assert!(matches!(
            settled_claim(&active("a"), &a),
            Some(ClaimOutcome::Claimed { resumed: true, .. })
        ));
        assert_eq!(
            settled_claim(&active("b"), &a),
            Some(ClaimOutcome::AlreadyOwned {
                owner: AgentId::from("b")
            })
        );
        let mut closed = active("a");
        closed.status = ConversationStatus::Closed;
        closed.owner_agent_id = None;
        assert_eq!(
            settled_claim(&closed, &a),
            Some(ClaimOutcome::NotClaimable {
                status: ConversationStatus::Closed
            })
        );
        let queued = Conversation::new_pending("cust", "Ana", Utc::now());
        assert_eq!(settled_claim(&queued, &a), None);
    }

    #[test]
    fn access_predicate() {
        let mut convo = active("a");
        convo.shared_with.insert("b@x.com".into());
        assert!(authorize_write(&convo, &AgentContext::new("a", "a@x.com")).is_ok());
        assert!(authorize_write(&convo, &AgentContext::new("b", "B@x.com")).is_ok());
        assert!(matches!(
            authorize_write(&convo, &AgentContext::new("c", "c@x.com")),
            Err(DesklineError::AccessDenied { .. })
        ));
        convo.status = ConversationStatus::Closed;
        assert!(matches!(
            authorize_write(&convo, &AgentContext::new("a", "a@x.com")),
            Err(DesklineError::ConversationClosed { .. })
        ));
    }

    #[test]
    fn capacity_message_names_limit() {
        let msg = ClaimOutcome::CapacityExceeded { active: 3, limit: 3 }.user_message();
        assert!(msg.contains('3'));
    }
}
