//! Membership Repository Implementation
//!
//! PostgreSQL implementation of membership operations. The unique
//! (user_id, server_id) constraint backs duplicate-join detection, and the
//! mute/nickname updates lock the row so concurrent moderators serialize.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Membership, MembershipRepository};
use crate::shared::error::AppError;

pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn find(&self, server_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, server_id, user_id, role, nickname, mute_until, joined_at
            FROM memberships
            WHERE server_id = $1 AND user_id = $2
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, server_id, user_id, role, nickname, mute_until, joined_at
            FROM memberships
            WHERE server_id = $1
            ORDER BY joined_at
            "#,
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let memberships = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, server_id, user_id, role, nickname, mute_until, joined_at
            FROM memberships
            WHERE user_id = $1
            ORDER BY joined_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    async fn create(&self, membership: &Membership) -> Result<Membership, AppError> {
        let result = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (id, server_id, user_id, role, nickname, mute_until, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, server_id, user_id, role, nickname, mute_until, joined_at
            "#,
        )
        .bind(membership.id)
        .bind(membership.server_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(&membership.nickname)
        .bind(membership.mute_until)
        .bind(membership.joined_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            Err(e) if AppError::is_unique_violation(&e) => Err(AppError::Conflict(
                "User is already a member of this server".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(
        &self,
        server_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let removed = sqlx::query_as::<_, Membership>(
            r#"
            DELETE FROM memberships
            WHERE server_id = $1 AND user_id = $2
            RETURNING id, server_id, user_id, role, nickname, mute_until, joined_at
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(removed)
    }

    async fn set_mute(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        mute_until: Option<DateTime<Utc>>,
    ) -> Result<Membership, AppError> {
        let mut tx = self.pool.begin().await?;

        let prior = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, server_id, user_id, role, nickname, mute_until, joined_at
            FROM memberships
            WHERE server_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

        sqlx::query(
            r#"
            UPDATE memberships SET mute_until = $3
            WHERE server_id = $1 AND user_id = $2
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .bind(mute_until)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        // The pre-update row lets callers capture the prior mute window.
        Ok(prior)
    }

    async fn set_nickname(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        nickname: Option<String>,
    ) -> Result<Membership, AppError> {
        let updated = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE memberships SET nickname = $3
            WHERE server_id = $1 AND user_id = $2
            RETURNING id, server_id, user_id, role, nickname, mute_until, joined_at
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .bind(nickname)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

        Ok(updated)
    }

    async fn is_member(&self, server_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM memberships WHERE server_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.0)
    }

    async fn count_by_server(&self, server_id: Uuid) -> Result<i64, AppError> {
        let result: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE server_id = $1")
                .bind(server_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(result.0)
    }
}
