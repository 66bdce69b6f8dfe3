//! Channel Repository Implementation
//!
//! PostgreSQL implementation of channel operations, including the DM
//! participant set.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Channel, ChannelRepository};
use crate::shared::error::AppError;

pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Channel>, AppError> {
        let channel = sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, server_id, name, kind, created_at
            FROM channels
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(channel)
    }

    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Channel>, AppError> {
        let channels = sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, server_id, name, kind, created_at
            FROM channels
            WHERE server_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(channels)
    }

    async fn create(&self, channel: &Channel) -> Result<Channel, AppError> {
        let created = sqlx::query_as::<_, Channel>(
            r#"
            INSERT INTO channels (id, server_id, name, kind, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, server_id, name, kind, created_at
            "#,
        )
        .bind(channel.id)
        .bind(channel.server_id)
        .bind(&channel.name)
        .bind(channel.kind)
        .bind(channel.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Channel {} not found", id)));
        }

        Ok(())
    }

    async fn participants(&self, channel_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id FROM dm_participants WHERE channel_id = $1
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn add_participant(&self, channel_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO dm_participants (channel_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (channel_id, user_id) DO NOTHING
            "#,
        )
        .bind(channel_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
