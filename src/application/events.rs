//! Outbound Event Envelope
//!
//! Events published to the transport use a tagged JSON envelope so gateway
//! processes can dispatch on the event name without knowing every payload
//! shape.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::Message;

/// Envelope for events pushed to gateway topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", content = "d")]
pub enum OutboundEvent {
    #[serde(rename = "MESSAGE_CREATE")]
    MessageCreate(MessagePayload),

    #[serde(rename = "MESSAGE_UPDATE")]
    MessageUpdate(MessagePayload),

    #[serde(rename = "MESSAGE_DELETE")]
    MessageDelete { id: i64, channel_id: Uuid },

    #[serde(rename = "MEMBER_REMOVE")]
    MemberRemove { server_id: Uuid, user_id: Uuid },

    #[serde(rename = "PRESENCE_UPDATE")]
    PresenceUpdate { user_id: Uuid, online: bool },
}

/// Message body carried by create and update events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: i64,
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Message> for MessagePayload {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            author_id: message.author_id,
            content: message.content.clone(),
            reply_to_id: message.reply_to_id,
            created_at: message.created_at,
            edited_at: message.edited_at,
        }
    }
}
