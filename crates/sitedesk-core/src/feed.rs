//! Change feed contract.
//!
//! Topic-scoped push notifications of entity mutations. Events are
//! delivered into single-consumer queues rather than callbacks, so no
//! feed delivery can re-enter cache state mid-mutation. The core never
//! trusts event payload contents for entity data; it reloads from the
//! record store instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::Result;
use crate::session::AuthEvent;

/// Entity kinds a project topic subscription is registered for.
///
/// Communications are outside the cached working set, but the
/// subscription contract is shared with the screens that show them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Milestone,
    Communication,
}

/// A single entity-mutation notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: EntityKind,
    pub entity_id: String,
    pub topic: String,
}

/// Identifies a live subscription for later teardown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionHandle {
    pub id: u64,
    pub topic: String,
}

/// A live topic subscription: its handle plus the event queue.
pub struct FeedSubscription {
    pub handle: SubscriptionHandle,
    pub events: UnboundedReceiver<ChangeEvent>,
}

/// A live session-notification subscription.
pub struct AuthFeedSubscription {
    pub handle: SubscriptionHandle,
    pub events: UnboundedReceiver<AuthEvent>,
}

/// Push-notification channel for entity mutations, scoped by topic.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Opens a subscription on a topic for the given entity kinds.
    async fn subscribe(&self, topic: &str, kinds: &[EntityKind]) -> Result<FeedSubscription>;

    /// Opens the session-changed notification stream.
    async fn subscribe_session(&self) -> Result<AuthFeedSubscription>;

    /// Tears down a subscription; stops delivery and closes its queue.
    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()>;
}

/// Formats the per-project change topic.
pub fn project_topic(project_id: &str) -> String {
    format!("project:{project_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_topic_format() {
        assert_eq!(project_topic("p-1"), "project:p-1");
    }
}
