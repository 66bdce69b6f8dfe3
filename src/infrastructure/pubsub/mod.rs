//! Pub/Sub Module
//!
//! Outbound event transport. The engine publishes serialized events to
//! topics; the gateway processes subscribed to those topics fan them out to
//! connected clients. Redis backs production, an in-memory recorder backs
//! tests.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::shared::error::AppError;

/// Topic carrying new messages of a channel.
pub fn channel_topic(channel_id: Uuid) -> String {
    format!("channel:{}", channel_id)
}

/// Topic carrying edits and deletions of a channel's messages.
pub fn channel_update_topic(channel_id: Uuid) -> String {
    format!("channel:{}:updates", channel_id)
}

/// Topic carrying announcement broadcasts of a server.
pub fn announcement_topic(server_id: Uuid) -> String {
    format!("server:{}:announcements", server_id)
}

/// Per-user queue for direct deliveries.
pub fn user_topic(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

/// Shared topic carrying presence changes; gateways filter by user.
pub fn presence_topic() -> String {
    "presence".to_string()
}

/// Transport for outbound events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publish a payload to a named topic.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), AppError>;

    /// Publish to a user's private queue.
    async fn publish_to_user(&self, user_id: Uuid, payload: &str) -> Result<(), AppError>;
}

/// Redis-backed transport using PUBLISH.
pub struct RedisPubSub {
    conn: ConnectionManager,
}

impl RedisPubSub {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(topic, payload).await?;
        Ok(())
    }

    async fn publish_to_user(&self, user_id: Uuid, payload: &str) -> Result<(), AppError> {
        self.publish(&user_topic(user_id), payload).await
    }
}

/// In-memory transport that records everything it publishes.
///
/// Used by tests to assert on delivery routing without a Redis instance.
#[derive(Default)]
pub struct MemoryPubSub {
    published: DashMap<String, Vec<String>>,
}

impl MemoryPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads published to a topic, in order.
    pub fn messages_for(&self, topic: &str) -> Vec<String> {
        self.published
            .get(topic)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Number of payloads published to a topic.
    pub fn count_for(&self, topic: &str) -> usize {
        self.published.get(topic).map(|entry| entry.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PubSub for MemoryPubSub {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), AppError> {
        self.published
            .entry(topic.to_string())
            .or_default()
            .push(payload.to_string());
        Ok(())
    }

    async fn publish_to_user(&self, user_id: Uuid, payload: &str) -> Result<(), AppError> {
        self.publish(&user_topic(user_id), payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_pubsub_records_in_order() {
        let pubsub = MemoryPubSub::new();
        let channel_id = Uuid::new_v4();
        let topic = channel_topic(channel_id);

        pubsub.publish(&topic, "first").await.unwrap();
        pubsub.publish(&topic, "second").await.unwrap();

        assert_eq!(pubsub.messages_for(&topic), vec!["first", "second"]);
        assert_eq!(pubsub.count_for("other"), 0);
    }
}
