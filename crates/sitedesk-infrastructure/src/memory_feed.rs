//! In-memory change feed.
//!
//! Fans emitted events out to live topic subscriptions through unbounded
//! queues. Unsubscribing drops the sender, which closes the consumer's
//! queue and ends its pump task naturally.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, UnboundedSender};

use sitedesk_core::error::Result;
use sitedesk_core::feed::{
    AuthFeedSubscription, ChangeEvent, ChangeFeed, EntityKind, FeedSubscription,
    SubscriptionHandle,
};
use sitedesk_core::session::AuthEvent;

const SESSION_TOPIC: &str = "auth";

struct TopicSubscription {
    topic: String,
    kinds: Vec<EntityKind>,
    tx: UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
struct FeedState {
    topics: HashMap<u64, TopicSubscription>,
    auth: HashMap<u64, UnboundedSender<AuthEvent>>,
}

/// In-memory [`ChangeFeed`] implementation.
#[derive(Default)]
pub struct MemoryChangeFeed {
    state: RwLock<FeedState>,
    next_id: AtomicU64,
}

impl MemoryChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&self, topic: &str) -> SubscriptionHandle {
        SubscriptionHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            topic: topic.to_string(),
        }
    }

    /// Delivers an entity-change event to matching subscribers.
    pub async fn emit(&self, event: ChangeEvent) {
        let state = self.state.read().await;
        for sub in state.topics.values() {
            if sub.topic == event.topic && sub.kinds.contains(&event.kind) {
                // A closed receiver just means the consumer went away first
                let _ = sub.tx.send(event.clone());
            }
        }
    }

    /// Delivers a session-changed notification to all session subscribers.
    pub async fn emit_auth(&self, event: AuthEvent) {
        let state = self.state.read().await;
        for tx in state.auth.values() {
            let _ = tx.send(event.clone());
        }
    }

    /// Number of live topic subscriptions.
    pub async fn active_subscriptions(&self) -> usize {
        self.state.read().await.topics.len()
    }
}

#[async_trait]
impl ChangeFeed for MemoryChangeFeed {
    async fn subscribe(&self, topic: &str, kinds: &[EntityKind]) -> Result<FeedSubscription> {
        let handle = self.next_handle(topic);
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.write().await.topics.insert(
            handle.id,
            TopicSubscription {
                topic: topic.to_string(),
                kinds: kinds.to_vec(),
                tx,
            },
        );
        tracing::debug!("[MemoryChangeFeed] Subscribed {} to '{}'", handle.id, topic);
        Ok(FeedSubscription { handle, events: rx })
    }

    async fn subscribe_session(&self) -> Result<AuthFeedSubscription> {
        let handle = self.next_handle(SESSION_TOPIC);
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.write().await.auth.insert(handle.id, tx);
        Ok(AuthFeedSubscription { handle, events: rx })
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()> {
        let mut state = self.state.write().await;
        state.topics.remove(&handle.id);
        state.auth.remove(&handle.id);
        tracing::debug!(
            "[MemoryChangeFeed] Unsubscribed {} from '{}'",
            handle.id,
            handle.topic
        );
        Ok(())
    }
}
