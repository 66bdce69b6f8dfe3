//! Message entity and repository trait.
//!
//! Per-message lifecycle: created -> [edited]* -> deleted. Deletion is
//! terminal; edits are repeatable and only touch content and `edited_at`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// A text message posted to a channel.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    /// Snowflake ID; channel history sorts by it
    pub id: i64,

    pub channel_id: Uuid,

    pub author_id: Uuid,

    pub content: String,

    /// ID of the message this one replies to, if any
    pub reply_to_id: Option<i64>,

    pub created_at: DateTime<Utc>,

    /// Set on every successful edit
    pub edited_at: Option<DateTime<Utc>>,
}

/// Repository trait for message data access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Channel history, newest first, optionally before a given ID.
    async fn find_by_channel(
        &self,
        channel_id: Uuid,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// Case-insensitive content search within a channel.
    async fn search(
        &self,
        channel_id: Uuid,
        keyword: &str,
        limit: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// Insert a message (also used to re-insert a captured message on undo).
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Replace the content and stamp `edited_at`, returning the updated row.
    async fn update_content(
        &self,
        id: i64,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Message, AppError>;

    /// Delete a message, returning the removed row if it existed.
    async fn delete(&self, id: i64) -> Result<Option<Message>, AppError>;
}
