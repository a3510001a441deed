// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push notification of conversation changes.
//!
//! Stores publish every written document to a [`ChangeHub`]. Each
//! subscriber gets its own [`Subscription`] that yields the documents
//! matching its query, in write order. Dropping the subscription cancels it.

use futures::Stream;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::types::Conversation;
use crate::update::ConversationQuery;

/// Default number of buffered changes per subscriber before it starts lagging.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Fan-out point for document change notifications.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    tx: broadcast::Sender<Conversation>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Notifies current subscribers. A hub with no subscribers drops the change.
    pub fn publish(&self, conversation: &Conversation) {
        if self.tx.send(conversation.clone()).is_err() {
            debug!(conversation_id = %conversation.id, "change published with no subscribers");
        }
    }

    pub fn subscribe(&self, query: ConversationQuery) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            query,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

/// An unbounded, cancellable sequence of changed documents.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Conversation>,
    query: ConversationQuery,
}

impl Subscription {
    /// Waits for the next matching change. Returns `None` once the store is gone.
    ///
    /// A subscriber that falls behind skips the snapshots it missed; the
    /// next document it receives is still the latest state of that conversation.
    pub async fn next(&mut self) -> Option<Conversation> {
        loop {
            match self.rx.recv().await {
                Ok(conversation) if self.query.matches(&conversation) => {
                    return Some(conversation);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change subscriber lagged, snapshots skipped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Conversation> + Send + Unpin {
        Box::pin(futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|conversation| (conversation, sub))
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use futures::StreamExt;

    use super::*;
    use crate::types::ConversationStatus;

    #[tokio::test]
    async fn subscription_filters_by_query() {
        let hub = ChangeHub::new(16);
        let mut queued = hub.subscribe(ConversationQuery::with_status(ConversationStatus::Queued));

        let mut a = Conversation::new_pending("c1", "Ana", Utc::now());
        hub.publish(&a);
        a.status = ConversationStatus::Queued;
        hub.publish(&a);

        let got = queued.next().await.unwrap();
        assert_eq!(got.status, ConversationStatus::Queued);
    }

    #[tokio::test]
    async fn stream_ends_when_hub_dropped() {
        let hub = ChangeHub::new(4);
        let sub = hub.subscribe(ConversationQuery::all());
        let convo = Conversation::new_pending("c1", "Ana", Utc::now());
        hub.publish(&convo);
        drop(hub);

        let items: Vec<_> = sub.into_stream().collect().await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn lagging_subscriber_keeps_receiving() {
        let hub = ChangeHub::new(2);
        let mut sub = hub.subscribe(ConversationQuery::all());
        let mut convo = Conversation::new_pending("c1", "Ana", Utc::now());
        for rev in 0..5 {
            convo.revision = rev;
            hub.publish(&convo);
        }
        let got = sub.next().await.unwrap();
        assert!(got.revision >= 3, "oldest snapshots were skipped");
    }
}
