//! Server Service
//!
//! Server lifecycle and membership management: creation with the atomic
//! owner membership, join/leave, member listing and nicknames.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::{
    Membership, MembershipRepository, Server, ServerRepository,
};
use crate::domain::value_objects::MembershipRole;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;

/// Server service trait defining server and membership operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerService: Send + Sync {
    /// Create a server. The creator becomes its OWNER atomically.
    async fn create_server(
        &self,
        request: CreateServerDto,
        owner_id: Uuid,
    ) -> Result<ServerDto, ServerError>;

    /// Get a server by ID.
    async fn get_server(&self, server_id: Uuid) -> Result<ServerDto, ServerError>;

    /// Delete a server. Owner only; memberships and invites cascade.
    async fn delete_server(&self, server_id: Uuid, actor_id: Uuid) -> Result<(), ServerError>;

    /// Add a user as a MEMBER directly (invite consumption bypasses this).
    async fn join(&self, server_id: Uuid, user_id: Uuid) -> Result<MemberDto, ServerError>;

    /// Remove the caller's own membership. The owner cannot leave.
    async fn leave(&self, server_id: Uuid, user_id: Uuid) -> Result<(), ServerError>;

    /// List all members of a server.
    async fn get_members(&self, server_id: Uuid) -> Result<Vec<MemberDto>, ServerError>;

    /// Set or clear a member's nickname.
    async fn update_nickname(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        nickname: Option<String>,
    ) -> Result<MemberDto, ServerError>;
}

/// Request DTO for creating a server.
#[derive(Debug, Clone, Validate)]
pub struct CreateServerDto {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

/// Server data transfer object.
#[derive(Debug, Clone)]
pub struct ServerDto {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl ServerDto {
    pub fn from_server(server: Server) -> Self {
        Self {
            id: server.id,
            owner_id: server.owner_id,
            name: server.name,
            description: server.description,
            created_at: server.created_at.to_rfc3339(),
        }
    }
}

/// Member data transfer object.
#[derive(Debug, Clone)]
pub struct MemberDto {
    pub server_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub nickname: Option<String>,
    pub joined_at: String,
}

impl MemberDto {
    pub fn from_membership(membership: Membership) -> Self {
        Self {
            server_id: membership.server_id,
            user_id: membership.user_id,
            role: membership.role,
            nickname: membership.nickname,
            joined_at: membership.joined_at.to_rfc3339(),
        }
    }
}

/// Server service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server not found")]
    NotFound,

    #[error("Membership not found")]
    NotAMember,

    #[error("Already a member of this server")]
    AlreadyMember,

    #[error("The owner cannot leave their own server")]
    OwnerCannotLeave,

    #[error("Permission denied")]
    Forbidden,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for ServerError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(_) => ServerError::NotFound,
            AppError::Conflict(_) => ServerError::AlreadyMember,
            AppError::Forbidden(_) => ServerError::Forbidden,
            AppError::Validation(msg) => ServerError::Validation(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

/// Server service implementation.
pub struct ServerServiceImpl<S, M>
where
    S: ServerRepository,
    M: MembershipRepository,
{
    server_repo: Arc<S>,
    membership_repo: Arc<M>,
}

impl<S, M> ServerServiceImpl<S, M>
where
    S: ServerRepository,
    M: MembershipRepository,
{
    pub fn new(server_repo: Arc<S>, membership_repo: Arc<M>) -> Self {
        Self {
            server_repo,
            membership_repo,
        }
    }
}

#[async_trait]
impl<S, M> ServerService for ServerServiceImpl<S, M>
where
    S: ServerRepository + 'static,
    M: MembershipRepository + 'static,
{
    async fn create_server(
        &self,
        request: CreateServerDto,
        owner_id: Uuid,
    ) -> Result<ServerDto, ServerError> {
        request.validate().map_err(validation_error)?;

        let server = Server::new(owner_id, request.name, request.description);
        let owner_membership = Membership::new(server.id, owner_id, MembershipRole::Owner);

        let created = self.server_repo.create(&server, &owner_membership).await?;

        tracing::info!(server_id = %created.id, %owner_id, "Created server");

        Ok(ServerDto::from_server(created))
    }

    async fn get_server(&self, server_id: Uuid) -> Result<ServerDto, ServerError> {
        let server = self
            .server_repo
            .find_by_id(server_id)
            .await?
            .ok_or(ServerError::NotFound)?;

        Ok(ServerDto::from_server(server))
    }

    async fn delete_server(&self, server_id: Uuid, actor_id: Uuid) -> Result<(), ServerError> {
        let server = self
            .server_repo
            .find_by_id(server_id)
            .await?
            .ok_or(ServerError::NotFound)?;

        if server.owner_id != actor_id {
            return Err(ServerError::Forbidden);
        }

        self.server_repo.delete(server_id).await?;

        tracing::info!(%server_id, "Deleted server");

        Ok(())
    }

    async fn join(&self, server_id: Uuid, user_id: Uuid) -> Result<MemberDto, ServerError> {
        self.server_repo
            .find_by_id(server_id)
            .await?
            .ok_or(ServerError::NotFound)?;

        let membership = Membership::new(server_id, user_id, MembershipRole::Member);
        // The unique (user, server) constraint turns a duplicate join into
        // Conflict, which maps to AlreadyMember.
        let created = self.membership_repo.create(&membership).await?;

        Ok(MemberDto::from_membership(created))
    }

    async fn leave(&self, server_id: Uuid, user_id: Uuid) -> Result<(), ServerError> {
        let server = self
            .server_repo
            .find_by_id(server_id)
            .await?
            .ok_or(ServerError::NotFound)?;

        if server.owner_id == user_id {
            return Err(ServerError::OwnerCannotLeave);
        }

        self.membership_repo
            .delete(server_id, user_id)
            .await?
            .ok_or(ServerError::NotAMember)?;

        Ok(())
    }

    async fn get_members(&self, server_id: Uuid) -> Result<Vec<MemberDto>, ServerError> {
        let memberships = self.membership_repo.find_by_server(server_id).await?;
        Ok(memberships
            .into_iter()
            .map(MemberDto::from_membership)
            .collect())
    }

    async fn update_nickname(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        nickname: Option<String>,
    ) -> Result<MemberDto, ServerError> {
        if let Some(ref nick) = nickname {
            if nick.is_empty() || nick.len() > 32 {
                return Err(ServerError::Validation(
                    "Nickname must be 1-32 characters".to_string(),
                ));
            }
        }

        let updated = match self
            .membership_repo
            .set_nickname(server_id, user_id, nickname)
            .await
        {
            Ok(membership) => membership,
            Err(AppError::NotFound(_)) => return Err(ServerError::NotAMember),
            Err(e) => return Err(e.into()),
        };

        Ok(MemberDto::from_membership(updated))
    }
}
