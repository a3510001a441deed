// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side projections over conversations.
//!
//! Nothing here writes to a conversation. A [`QueueView`] is derived from
//! the current document set and can be thrown away and recomputed at any
//! time; [`QueueViewWatcher`] keeps one fresh from the change feed.

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use deskline_core::{
    AgentContext, Conversation, ConversationQuery, ConversationStatus, DesklineError,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::desk::Desk;

type Predicate = Arc<dyn Fn(&Conversation) -> bool + Send + Sync>;

/// Optional narrowing applied after retrieval.
#[derive(Clone, Default)]
pub struct ViewFilter {
    service_option: Option<String>,
    region: Option<String>,
    predicate: Option<Predicate>,
}

impl ViewFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps conversations whose intake service option equals `option`.
    pub fn service_option(mut self, option: impl Into<String>) -> Self {
        self.service_option = Some(option.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn predicate(mut self, f: impl Fn(&Conversation) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(f));
        self
    }

    pub fn matches(&self, conversation: &Conversation) -> bool {
        let intake = conversation.intake.as_ref();
        if let Some(option) = &self.service_option
            && intake.is_none_or(|i| !i.service_option.eq_ignore_ascii_case(option))
        {
            return false;
        }
        if let Some(region) = &self.region
            && intake.is_none_or(|i| !i.region.eq_ignore_ascii_case(region))
        {
            return false;
        }
        self.predicate.as_ref().is_none_or(|p| p(conversation))
    }
}

impl fmt::Debug for ViewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewFilter")
            .field("service_option", &self.service_option)
            .field("region", &self.region)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Waiting and active cohorts, each in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueView {
    /// `queued`, oldest `queued_at` first.
    pub waiting: Vec<Conversation>,
    /// `active`, most recent `last_message` first.
    pub active: Vec<Conversation>,
}

impl QueueView {
    /// Builds both cohorts from an arbitrary document set.
    ///
    /// With `agent` set, the active cohort keeps only conversations the agent
    /// owns or was granted.
    pub fn project(
        conversations: impl IntoIterator<Item = Conversation>,
        filter: &ViewFilter,
        agent: Option<&AgentContext>,
    ) -> Self {
        let mut view = QueueView::default();
        for conversation in conversations.into_iter().filter(|c| filter.matches(c)) {
            match conversation.status {
                ConversationStatus::Queued => view.waiting.push(conversation),
                ConversationStatus::Active
                    if agent.is_none_or(|ctx| conversation.is_participant(ctx)) =>
                {
                    view.active.push(conversation)
                }
                _ => {}
            }
        }
        view.waiting.sort_by(|a, b| {
            a.queued_at
                .cmp(&b.queued_at)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        view.active.sort_by_key(|c| {
            (
                Reverse(c.last_message.as_ref().map(|m| m.timestamp)),
                c.started_at,
            )
        });
        view
    }
}

impl Desk {
    /// Unclaimed conversations with intake data, oldest first.
    pub async fn queue_view(&self, filter: &ViewFilter) -> Result<Vec<Conversation>, DesklineError> {
        let query = ConversationQuery::with_status(ConversationStatus::Queued);
        let found = self.store.list_conversations(&query).await?;
        Ok(QueueView::project(found, filter, None).waiting)
    }

    /// Active conversations, most recently updated first. With `agent`,
    /// only the ones it owns or shares.
    pub async fn active_view(
        &self,
        agent: Option<&AgentContext>,
        filter: &ViewFilter,
    ) -> Result<Vec<Conversation>, DesklineError> {
        let mut query = ConversationQuery::with_status(ConversationStatus::Active);
        if let Some(ctx) = agent {
            query = query.involving(ctx.clone());
        }
        let found = self.store.list_conversations(&query).await?;
        Ok(QueueView::project(found, filter, agent).active)
    }

    /// Starts a push-driven projection. Dropping the watcher stops it.
    pub async fn watch_views(
        &self,
        filter: ViewFilter,
        agent: Option<AgentContext>,
    ) -> Result<QueueViewWatcher, DesklineError> {
        // Subscribe before the first read so no change falls in between.
        let mut changes = self.store.subscribe(ConversationQuery::all());
        let initial = self.project_now(&filter, agent.as_ref()).await?;
        let (tx, rx) = watch::channel(initial);
        let cancel = CancellationToken::new();

        let desk = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                let changed = tokio::select! {
                    _ = token.cancelled() => break,
                    changed = changes.next() => changed,
                };
                let Some(changed) = changed else {
                    debug!("change feed closed, view watcher stopping");
                    break;
                };
                match desk.project_now(&filter, agent.as_ref()).await {
                    Ok(view) => {
                        // Receivers only wake on a different projection.
                        tx.send_if_modified(|current| {
                            if *current == view {
                                false
                            } else {
                                *current = view;
                                true
                            }
                        });
                    }
                    Err(e) => {
                        warn!(conversation_id = %changed.id, error = %e, "view refresh failed");
                    }
                }
                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok(QueueViewWatcher {
            rx,
            cancel,
            task: Some(task),
        })
    }

    async fn project_now(
        &self,
        filter: &ViewFilter,
        agent: Option<&AgentContext>,
    ) -> Result<QueueView, DesklineError> {
        let query = ConversationQuery {
            statuses: vec![ConversationStatus::Queued, ConversationStatus::Active],
            ..ConversationQuery::default()
        };
        let found = self.store.list_conversations(&query).await?;
        Ok(QueueView::project(found, filter, agent))
    }
}

/// Handle on a projection kept current by the change feed.
pub struct QueueViewWatcher {
    rx: watch::Receiver<QueueView>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl QueueViewWatcher {
    /// The latest projection.
    pub fn current(&self) -> QueueView {
        self.rx.borrow().clone()
    }

    /// Waits until the projection differs from the last one seen.
    /// Returns `None` once the watcher has stopped.
    pub async fn changed(&mut self) -> Option<QueueView> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn receiver(&self) -> watch::Receiver<QueueView> {
        self.rx.clone()
    }

    /// Stops the background refresh and waits for it to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for QueueViewWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
