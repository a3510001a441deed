// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The coordination facade and its collaborators.

use std::sync::Arc;

use dashmap::DashMap;
use deskline_config::DesklineConfig;
use deskline_config::model::MessagesConfig;
use deskline_core::{
    AgentId, BlobStore, ChangeFeed, Conversation, ConversationId, ConversationStore,
    DesklineError, Message,
};
use tokio::sync::Mutex;

use crate::retry::RetryPolicy;

/// A document store that also pushes change notifications.
pub trait DocumentStore: ConversationStore + ChangeFeed {}

impl<T: ConversationStore + ChangeFeed> DocumentStore for T {}

/// Engine settings derived from configuration.
#[derive(Debug, Clone)]
pub struct DeskSettings {
    /// Capacity limit N: active conversations one agent may own.
    pub max_active_per_agent: usize,
    pub messages: MessagesConfig,
    pub retry: RetryPolicy,
}

impl From<&DesklineConfig> for DeskSettings {
    fn from(config: &DesklineConfig) -> Self {
        Self {
            max_active_per_agent: config.desk.max_active_per_agent,
            messages: config.messages.clone(),
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self::from(&DesklineConfig::default())
    }
}

/// Coordinates conversations between the inbound queue and agents.
///
/// Cheap to clone; clones share the store, blob store, and claim locks.
#[derive(Clone)]
pub struct Desk {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) settings: Arc<DeskSettings>,
    /// Serialises count-and-claim per agent within this process.
    pub(crate) claim_locks: Arc<DashMap<AgentId, Arc<Mutex<()>>>>,
}

impl Desk {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        settings: DeskSettings,
    ) -> Self {
        Self {
            store,
            blobs,
            settings: Arc::new(settings),
            claim_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn settings(&self) -> &DeskSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Reads one conversation, failing with `NotFound` if it does not exist.
    pub async fn conversation(&self, id: &ConversationId) -> Result<Conversation, DesklineError> {
        self.store
            .get_conversation(id)
            .await?
            .ok_or_else(|| DesklineError::conversation_not_found(id))
    }

    /// The conversation's log in order, optionally after position `after_seq`.
    pub async fn messages(
        &self,
        id: &ConversationId,
        after_seq: Option<u64>,
    ) -> Result<Vec<Message>, DesklineError> {
        self.store.list_messages(id, after_seq).await
    }

    /// Shuts down both collaborators, reporting the first failure.
    pub async fn shutdown(&self) -> Result<(), DesklineError> {
        let store = self.store.shutdown().await;
        let blobs = self.blobs.shutdown().await;
        store.and(blobs)
    }

    pub(crate) fn claim_lock(&self, agent: &AgentId) -> Arc<Mutex<()>> {
        self.claim_locks.entry(agent.clone()).or_default().clone()
    }
}
