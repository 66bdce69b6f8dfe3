//! Server Repository Implementation
//!
//! PostgreSQL implementation of server operations. Server creation inserts
//! the server row and the owner's membership in one transaction so a server
//! without an OWNER is never observable.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Membership, Server, ServerRepository};
use crate::shared::error::AppError;

pub struct PgServerRepository {
    pool: PgPool,
}

impl PgServerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServerRepository for PgServerRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Server>, AppError> {
        let server = sqlx::query_as::<_, Server>(
            r#"
            SELECT id, owner_id, name, description, created_at
            FROM servers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(server)
    }

    async fn create(
        &self,
        server: &Server,
        owner_membership: &Membership,
    ) -> Result<Server, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Server>(
            r#"
            INSERT INTO servers (id, owner_id, name, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, name, description, created_at
            "#,
        )
        .bind(server.id)
        .bind(server.owner_id)
        .bind(&server.name)
        .bind(&server.description)
        .bind(server.created_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO memberships (id, server_id, user_id, role, nickname, mute_until, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(owner_membership.id)
        .bind(owner_membership.server_id)
        .bind(owner_membership.user_id)
        .bind(owner_membership.role)
        .bind(&owner_membership.nickname)
        .bind(owner_membership.mute_until)
        .bind(owner_membership.joined_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM servers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Server {} not found", id)));
        }

        Ok(())
    }
}
