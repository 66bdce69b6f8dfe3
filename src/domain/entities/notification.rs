//! Notification entity and repository trait.
//!
//! Written by the notification observer when a message mentions a user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Mention,
}

/// A persisted notification record for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub channel_id: Uuid,
    pub message_id: i64,
    pub sender_id: Uuid,
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn mention(recipient_id: Uuid, channel_id: Uuid, message_id: i64, sender_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            channel_id,
            message_id,
            sender_id,
            kind: NotificationKind::Mention,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Repository trait for notification data access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a notification.
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError>;

    /// Unread notifications for a recipient, newest first.
    async fn find_unread(&self, recipient_id: Uuid) -> Result<Vec<Notification>, AppError>;

    /// Mark a notification as read.
    async fn mark_read(&self, id: Uuid) -> Result<(), AppError>;

    /// Remove all notifications attached to a message (message deletion).
    async fn delete_by_message(&self, message_id: i64) -> Result<u64, AppError>;
}
