//! Notification Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Notification, NotificationRepository};
use crate::shared::error::AppError;

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, recipient_id, channel_id, message_id, sender_id, kind, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, recipient_id, channel_id, message_id, sender_id, kind, read, created_at
            "#,
        )
        .bind(notification.id)
        .bind(notification.recipient_id)
        .bind(notification.channel_id)
        .bind(notification.message_id)
        .bind(notification.sender_id)
        .bind(notification.kind)
        .bind(notification.read)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_unread(&self, recipient_id: Uuid) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, recipient_id, channel_id, message_id, sender_id, kind, read, created_at
            FROM notifications
            WHERE recipient_id = $1 AND read = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn mark_read(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }

        Ok(())
    }

    async fn delete_by_message(&self, message_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE message_id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
