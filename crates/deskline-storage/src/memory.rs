// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process document store.
//!
//! Holds every document behind one async mutex, which gives the same
//! per-document atomicity as the SQLite store. Used by tests and by
//! short-lived CLI sessions that do not need persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use deskline_core::{
    Adapter, AdapterType, ChangeFeed, ChangeHub, Conversation, ConversationId, ConversationPatch,
    ConversationQuery, ConversationStore, DesklineError, HealthStatus, Message, NewMessage,
    Precondition, Subscription, UpdateOutcome,
};

#[derive(Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    logs: HashMap<ConversationId, Vec<Message>>,
}

/// Document store kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    hub: ChangeHub,
    failing_appends: AtomicUsize,
    failing_updates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` appends fail with a transient storage error.
    pub fn fail_next_appends(&self, n: usize) {
        self.failing_appends.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` conditional updates fail with a transient storage error.
    pub fn fail_next_updates(&self, n: usize) {
        self.failing_updates.store(n, Ordering::SeqCst);
    }

    fn take_fault(counter: &AtomicUsize, op: &str) -> Result<(), DesklineError> {
        let tripped = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(DesklineError::storage(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentStore
    }

    async fn health_check(&self) -> Result<HealthStatus, DesklineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DesklineError> {
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), DesklineError> {
        let mut state = self.state.lock().await;
        if state.conversations.contains_key(&conversation.id) {
            return Err(DesklineError::Validation(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }
        state
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        self.hub.publish(conversation);
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, DesklineError> {
        Ok(self.state.lock().await.conversations.get(id).cloned())
    }

    async fn conditional_update(
        &self,
        id: &ConversationId,
        expected: &Precondition,
        patch: &ConversationPatch,
    ) -> Result<UpdateOutcome, DesklineError> {
        Self::take_fault(&self.failing_updates, "update")?;
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .get_mut(id)
            .ok_or_else(|| DesklineError::conversation_not_found(id))?;
        if !expected.matches(conversation) || !patch.permits(conversation) {
            return Ok(UpdateOutcome::PreconditionFailed(conversation.clone()));
        }
        patch.apply(conversation, Utc::now());
        let written = conversation.clone();
        self.hub.publish(&written);
        Ok(UpdateOutcome::Applied(written))
    }

    async fn list_conversations(
        &self,
        query: &ConversationQuery,
    ) -> Result<Vec<Conversation>, DesklineError> {
        let state = self.state.lock().await;
        let mut found: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message, DesklineError> {
        Self::take_fault(&self.failing_appends, "append")?;
        let mut state = self.state.lock().await;
        let status = state
            .conversations
            .get(&message.conversation_id)
            .map(|c| c.status)
            .ok_or_else(|| DesklineError::conversation_not_found(&message.conversation_id))?;

        let log = state.logs.entry(message.conversation_id.clone()).or_default();
        if let Some(existing) = log.iter().find(|m| m.id == message.id) {
            return Ok(existing.clone());
        }
        if status.is_terminal() {
            return Err(DesklineError::ConversationClosed {
                id: message.conversation_id.to_string(),
            });
        }

        let now = Utc::now();
        let timestamp = log.last().map_or(now, |last| last.timestamp.max(now));
        let stored = Message {
            id: message.id,
            conversation_id: message.conversation_id,
            seq: log.len() as u64 + 1,
            sender: message.sender,
            notice: message.notice,
            timestamp,
            payload: message.payload,
        };
        log.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
        after_seq: Option<u64>,
    ) -> Result<Vec<Message>, DesklineError> {
        let state = self.state.lock().await;
        let after = after_seq.unwrap_or(0);
        Ok(state
            .logs
            .get(conversation_id)
            .map(|log| log.iter().filter(|m| m.seq > after).cloned().collect())
            .unwrap_or_default())
    }
}

impl ChangeFeed for MemoryStore {
    fn subscribe(&self, query: ConversationQuery) -> Subscription {
        self.hub.subscribe(query)
    }
}
