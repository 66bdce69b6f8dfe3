//! Channel entity and repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Channel type. Determines the delivery route for messages posted to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "channel_kind", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Text,
    Voice,
    Announcement,
    Dm,
}

/// A communication space within a server.
///
/// The back-reference to the server is weak: the server owns the channel,
/// not the other way around. DM channels additionally carry a participant
/// set (the users whose private queues receive the messages).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Channel {
    pub id: Uuid,

    pub server_id: Uuid,

    pub name: String,

    pub kind: ChannelType,

    pub created_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(server_id: Uuid, name: String, kind: ChannelType) -> Self {
        Self {
            id: Uuid::new_v4(),
            server_id,
            name,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Repository trait for channel data access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Find a channel by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Channel>, AppError>;

    /// List all channels of a server.
    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Channel>, AppError>;

    /// Create a channel.
    async fn create(&self, channel: &Channel) -> Result<Channel, AppError>;

    /// Delete a channel.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Participant user IDs of a DM channel (empty for other types).
    async fn participants(&self, channel_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Add a participant to a DM channel.
    async fn add_participant(&self, channel_id: Uuid, user_id: Uuid) -> Result<(), AppError>;
}
