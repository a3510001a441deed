// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store and change feed traits.

use async_trait::async_trait;

use crate::error::DesklineError;
use crate::feed::Subscription;
use crate::traits::adapter::Adapter;
use crate::types::{Conversation, ConversationId, Message, NewMessage};
use crate::update::{ConversationPatch, ConversationQuery, Precondition, UpdateOutcome};

/// Persistence for conversations and their message logs.
///
/// A conversation document is the unit of mutual exclusion: every write to
/// one document is atomic with respect to other writes to that document.
/// Writes to different documents are independent.
#[async_trait]
pub trait ConversationStore: Adapter {
    /// Inserts a new conversation. Fails if the id is already taken.
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), DesklineError>;

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, DesklineError>;

    /// Applies `patch` only if the stored document satisfies `expected`.
    ///
    /// Returns [`DesklineError::NotFound`] when the document does not exist.
    async fn conditional_update(
        &self,
        id: &ConversationId,
        expected: &Precondition,
        patch: &ConversationPatch,
    ) -> Result<UpdateOutcome, DesklineError>;

    async fn list_conversations(
        &self,
        query: &ConversationQuery,
    ) -> Result<Vec<Conversation>, DesklineError>;

    /// Appends to a conversation's log, assigning the next position and a
    /// timestamp no earlier than the previous entry's.
    ///
    /// Rejects missing parents with `NotFound` and closed parents with
    /// `ConversationClosed`. Resubmitting a message id that is already in the
    /// log returns the stored entry instead of writing a duplicate.
    async fn append_message(&self, message: NewMessage) -> Result<Message, DesklineError>;

    /// Lists log entries in order, optionally resuming after position `after_seq`.
    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
        after_seq: Option<u64>,
    ) -> Result<Vec<Message>, DesklineError>;
}

/// Push subscription over conversation documents.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, query: ConversationQuery) -> Subscription;
}
