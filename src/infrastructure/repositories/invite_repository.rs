//! Invite Repository Implementation
//!
//! PostgreSQL implementation of invite operations. The consume path locks
//! the invite row, re-validates it and applies the membership insert and
//! use-count increment in one transaction.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{ConsumeOutcome, Invite, InviteRepository, Membership};
use crate::domain::value_objects::MembershipRole;
use crate::shared::error::AppError;

pub struct PgInviteRepository {
    pool: PgPool,
}

impl PgInviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InviteRepository for PgInviteRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invite>, AppError> {
        let invite = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, code, server_id, created_by, created_at,
                   expires_at, max_uses, current_uses, is_active
            FROM invites
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invite)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Invite>, AppError> {
        let invite = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, code, server_id, created_by, created_at,
                   expires_at, max_uses, current_uses, is_active
            FROM invites
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invite)
    }

    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Invite>, AppError> {
        let invites = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, code, server_id, created_by, created_at,
                   expires_at, max_uses, current_uses, is_active
            FROM invites
            WHERE server_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invites)
    }

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Invite>, AppError> {
        let invites = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, code, server_id, created_by, created_at,
                   expires_at, max_uses, current_uses, is_active
            FROM invites
            WHERE created_by = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invites)
    }

    async fn create(&self, invite: &Invite) -> Result<Invite, AppError> {
        let result = sqlx::query_as::<_, Invite>(
            r#"
            INSERT INTO invites (id, code, server_id, created_by, created_at,
                                 expires_at, max_uses, current_uses, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, code, server_id, created_by, created_at,
                      expires_at, max_uses, current_uses, is_active
            "#,
        )
        .bind(invite.id)
        .bind(&invite.code)
        .bind(invite.server_id)
        .bind(invite.created_by)
        .bind(invite.created_at)
        .bind(invite.expires_at)
        .bind(invite.max_uses)
        .bind(invite.current_uses)
        .bind(invite.is_active)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            Err(e) if AppError::is_unique_violation(&e) => Err(AppError::Conflict(
                "Invite code already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn consume(&self, code: &str, user_id: Uuid) -> Result<ConsumeOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let invite = sqlx::query_as::<_, Invite>(
            r#"
            SELECT id, code, server_id, created_by, created_at,
                   expires_at, max_uses, current_uses, is_active
            FROM invites
            WHERE code = $1
            FOR UPDATE
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        let invite = match invite {
            Some(invite) => invite,
            None => return Ok(ConsumeOutcome::NotFound),
        };

        if !invite.is_valid(Utc::now()) {
            return Ok(ConsumeOutcome::Expired);
        }

        let existing: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM memberships WHERE server_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(invite.server_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if existing.0 {
            return Ok(ConsumeOutcome::AlreadyMember);
        }

        let membership = Membership::new(invite.server_id, user_id, MembershipRole::Member);

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
        .fetch_one(&mut *tx)
        .await;

        // A racing accept on another connection can land between the
        // existence check and this insert; the unique (server_id, user_id)
        // constraint settles it.
        let created = match result {
            Ok(created) => created,
            Err(e) if AppError::is_unique_violation(&e) => {
                return Ok(ConsumeOutcome::AlreadyMember);
            }
            Err(e) => return Err(e.into()),
        };

        // Deactivate in the same statement when this use hits the cap.
        sqlx::query(
            r#"
            UPDATE invites
            SET current_uses = current_uses + 1,
                is_active = (max_uses IS NULL OR current_uses + 1 < max_uses)
            WHERE id = $1
            "#,
        )
        .bind(invite.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ConsumeOutcome::Joined(created))
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE invites SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Invite {} not found", id)));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM invites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Invite {} not found", id)));
        }

        Ok(())
    }
}
