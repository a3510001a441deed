// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for engine integration testing.
//!
//! `TestHarness` assembles a [`Desk`] over either the in-memory store or a
//! temp SQLite database, with a [`MockBlobStore`] for media, and offers
//! seeding helpers for the common lifecycle states.

use std::sync::Arc;
use std::time::Duration;

use deskline_config::model::StorageConfig;
use deskline_core::{
    AgentContext, Conversation, ConversationStatus, DesklineError, IntakeFields,
};
use deskline_engine::{ClaimOutcome, Desk, DeskSettings, DocumentStore, RetryPolicy};
use deskline_storage::{MemoryStore, SqliteStore};

use crate::mock_blob::MockBlobStore;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    settings: DeskSettings,
    sqlite: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut settings = DeskSettings::default();
        // Keep retries fast in tests.
        settings.retry = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        };
        Self {
            settings,
            sqlite: false,
        }
    }

    /// Set the per-agent capacity limit.
    pub fn with_capacity(mut self, n: usize) -> Self {
        self.settings.max_active_per_agent = n;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.settings.retry = retry;
        self
    }

    /// Use a temp SQLite database instead of the in-memory store.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Build the test harness, creating all required collaborators.
    pub async fn build(self) -> Result<TestHarness, DesklineError> {
        let temp_dir = tempfile::TempDir::new().map_err(DesklineError::storage)?;
        let memory = Arc::new(MemoryStore::new());

        let store: Arc<dyn DocumentStore> = if self.sqlite {
            let db_path = temp_dir.path().join("test.db");
            let sqlite = SqliteStore::new(StorageConfig {
                database_path: db_path.to_string_lossy().to_string(),
                wal_mode: true,
            });
            sqlite.initialize().await?;
            Arc::new(sqlite)
        } else {
            memory.clone()
        };

        let blobs = Arc::new(MockBlobStore::new());
        let desk = Desk::new(store, blobs.clone(), self.settings);

        Ok(TestHarness {
            desk,
            memory,
            blobs,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a desk, mock blobs, and temp storage.
pub struct TestHarness {
    pub desk: Desk,
    /// The in-memory store; also the desk's store unless SQLite was requested.
    pub memory: Arc<MemoryStore>,
    pub blobs: Arc<MockBlobStore>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// An in-memory harness with default settings.
    pub async fn new() -> Result<Self, DesklineError> {
        Self::builder().build().await
    }

    /// Agent context with a derived `<id>@x.com` email.
    pub fn agent(id: &str) -> AgentContext {
        AgentContext::new(id, format!("{id}@x.com"))
    }

    /// A complete intake form for `name`.
    pub fn intake(name: &str) -> IntakeFields {
        IntakeFields {
            name: name.to_string(),
            phone: None,
            distributor: "North Grid".into(),
            region: "north".into(),
            service_option: "remote".into(),
            site_code: "SE-01".into(),
            component: "recloser".into(),
            controller_model: "C-100".into(),
            comm_mode: "GPRS".into(),
            comm_subtype: Some("V2COM".into()),
            ip: Some("10.0.0.7".into()),
            port: Some("502".into()),
        }
    }

    /// Opens a conversation and submits intake, leaving it `queued`.
    pub async fn queued(&self, customer: &str) -> Result<Conversation, DesklineError> {
        let convo = self.desk.open_conversation(customer, customer).await?;
        self.desk.submit_intake(&convo.id, Self::intake(customer)).await
    }

    /// A queued conversation claimed by `agent`.
    pub async fn active_for(
        &self,
        customer: &str,
        agent: &AgentContext,
    ) -> Result<Conversation, DesklineError> {
        let convo = self.queued(customer).await?;
        match self.desk.claim(&convo.id, agent).await? {
            ClaimOutcome::Claimed { conversation, .. } => Ok(conversation),
            other => Err(DesklineError::Internal(format!("seed claim failed: {other:?}"))),
        }
    }

    /// Current status of a conversation.
    pub async fn status(&self, convo: &Conversation) -> Result<ConversationStatus, DesklineError> {
        Ok(self.desk.conversation(&convo.id).await?.status)
    }
}
