//! Message Repository Implementation
//!
//! PostgreSQL implementation of message operations. Snowflake IDs order
//! history, so pagination keys on the ID rather than the timestamp.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Message, MessageRepository};
use crate::shared::error::AppError;

pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, channel_id, author_id, content, reply_to_id, created_at, edited_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn find_by_channel(
        &self,
        channel_id: Uuid,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, channel_id, author_id, content, reply_to_id, created_at, edited_at
            FROM messages
            WHERE channel_id = $1
              AND ($2::BIGINT IS NULL OR id < $2)
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(channel_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn search(
        &self,
        channel_id: Uuid,
        keyword: &str,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let pattern = format!("%{}%", keyword.replace('%', "\\%").replace('_', "\\_"));

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, channel_id, author_id, content, reply_to_id, created_at, edited_at
            FROM messages
            WHERE channel_id = $1 AND content ILIKE $2
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(channel_id)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let created = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, channel_id, author_id, content, reply_to_id, created_at, edited_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, channel_id, author_id, content, reply_to_id, created_at, edited_at
            "#,
        )
        .bind(message.id)
        .bind(message.channel_id)
        .bind(message.author_id)
        .bind(&message.content)
        .bind(message.reply_to_id)
        .bind(message.created_at)
        .bind(message.edited_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_content(
        &self,
        id: i64,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Message, AppError> {
        let updated = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages SET content = $2, edited_at = $3
            WHERE id = $1
            RETURNING id, channel_id, author_id, content, reply_to_id, created_at, edited_at
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(edited_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;

        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<Option<Message>, AppError> {
        let removed = sqlx::query_as::<_, Message>(
            r#"
            DELETE FROM messages
            WHERE id = $1
            RETURNING id, channel_id, author_id, content, reply_to_id, created_at, edited_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(removed)
    }
}
