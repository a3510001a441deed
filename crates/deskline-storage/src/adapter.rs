// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ConversationStore and ChangeFeed traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use deskline_config::model::StorageConfig;
use deskline_core::{
    Adapter, AdapterType, ChangeFeed, ChangeHub, Conversation, ConversationId, ConversationPatch,
    ConversationQuery, ConversationStore, DesklineError, HealthStatus, Message, NewMessage,
    Precondition, Subscription, UpdateOutcome,
};

use crate::database::Database;
use crate::queries;
use crate::queries::conversations::CasResult;
use crate::queries::messages::AppendResult;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened by
/// [`initialize`](SqliteStore::initialize). Every applied document write is
/// published to the store's [`ChangeHub`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
    hub: ChangeHub,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
            hub: ChangeHub::default(),
        }
    }

    /// Opens the database and applies pending migrations.
    pub async fn initialize(&self) -> Result<(), DesklineError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| DesklineError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, DesklineError> {
        self.db
            .get()
            .ok_or_else(|| DesklineError::storage("storage not initialized -- call initialize() first"))
    }
}

#[async_trait]
impl Adapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentStore
    }

    async fn health_check(&self) -> Result<HealthStatus, DesklineError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DesklineError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), DesklineError> {
        queries::conversations::insert_conversation(self.db()?, conversation).await?;
        self.hub.publish(conversation);
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, DesklineError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn conditional_update(
        &self,
        id: &ConversationId,
        expected: &Precondition,
        patch: &ConversationPatch,
    ) -> Result<UpdateOutcome, DesklineError> {
        match queries::conversations::conditional_update(self.db()?, id, expected, patch).await? {
            CasResult::Missing => Err(DesklineError::conversation_not_found(id)),
            CasResult::Rejected(current) => Ok(UpdateOutcome::PreconditionFailed(current)),
            CasResult::Applied(written) => {
                self.hub.publish(&written);
                Ok(UpdateOutcome::Applied(written))
            }
        }
    }

    async fn list_conversations(
        &self,
        query: &ConversationQuery,
    ) -> Result<Vec<Conversation>, DesklineError> {
        queries::conversations::list_conversations(self.db()?, query).await
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message, DesklineError> {
        let conversation_id = message.conversation_id.clone();
        match queries::messages::append_message(self.db()?, message).await? {
            AppendResult::Missing => Err(DesklineError::conversation_not_found(conversation_id)),
            AppendResult::Closed => Err(DesklineError::ConversationClosed {
                id: conversation_id.to_string(),
            }),
            AppendResult::Appended(stored) => Ok(stored),
        }
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
        after_seq: Option<u64>,
    ) -> Result<Vec<Message>, DesklineError> {
        queries::messages::list_messages(self.db()?, conversation_id, after_seq).await
    }
}

impl ChangeFeed for SqliteStore {
    fn subscribe(&self, query: ConversationQuery) -> Subscription {
        self.hub.subscribe(query)
    }
}
