//! Invite Service
//!
//! Handles server invite operations including creation, validation, and
//! consumption. Code generation retries on collision; consumption is a
//! single atomic repository operation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::{
    ConsumeOutcome, Invite, InviteRepository, MembershipRepository, ServerRepository,
};
use crate::domain::value_objects::MembershipRole;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

use super::server_service::MemberDto;

/// Invite service trait defining invite operations.
#[async_trait]
pub trait InviteService: Send + Sync {
    /// Create a new invite for a server.
    async fn create_invite(
        &self,
        request: CreateInviteDto,
        inviter_id: Uuid,
    ) -> Result<InviteDto, InviteError>;

    /// Get an invite by its code.
    async fn get_invite(&self, code: &str) -> Result<InviteDto, InviteError>;

    /// Get all invites for a server.
    async fn get_server_invites(&self, server_id: Uuid) -> Result<Vec<InviteDto>, InviteError>;

    /// Get all invites a user has created, across servers.
    async fn get_user_invites(&self, user_id: Uuid) -> Result<Vec<InviteDto>, InviteError>;

    /// Consume an invite to join its server.
    async fn accept_invite(&self, code: &str, user_id: Uuid) -> Result<MemberDto, InviteError>;

    /// Deactivate an invite. Only its creator or the server owner may.
    async fn revoke_invite(&self, invite_id: Uuid, actor_id: Uuid) -> Result<(), InviteError>;

    /// Remove an invite record entirely. Same authorization as revocation.
    async fn delete_invite(&self, invite_id: Uuid, actor_id: Uuid) -> Result<(), InviteError>;

    /// Check whether an invite is currently valid.
    async fn validate_invite(&self, code: &str) -> Result<InviteValidationDto, InviteError>;
}

/// Request DTO for creating an invite.
#[derive(Debug, Clone)]
pub struct CreateInviteDto {
    pub server_id: Uuid,
    /// Maximum number of uses (None = unlimited).
    pub max_uses: Option<i32>,
    /// Hours until expiration (None = never expires).
    pub expires_in_hours: Option<i64>,
}

/// Invite data transfer object.
#[derive(Debug, Clone)]
pub struct InviteDto {
    pub id: Uuid,
    pub code: String,
    pub server_id: Uuid,
    pub created_by: Uuid,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub is_valid: bool,
}

impl InviteDto {
    pub fn from_invite(invite: Invite) -> Self {
        let is_valid = invite.is_valid(Utc::now());
        Self {
            id: invite.id,
            code: invite.code,
            server_id: invite.server_id,
            created_by: invite.created_by,
            max_uses: invite.max_uses,
            current_uses: invite.current_uses,
            expires_at: invite.expires_at.map(|dt| dt.to_rfc3339()),
            created_at: invite.created_at.to_rfc3339(),
            is_valid,
        }
    }
}

/// Invite validation result.
#[derive(Debug, Clone)]
pub struct InviteValidationDto {
    pub code: String,
    pub is_valid: bool,
    /// Remaining uses (None if unlimited).
    pub remaining_uses: Option<i32>,
    /// Seconds until expiration (None if never).
    pub expires_in: Option<i64>,
}

/// Invite service errors.
#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    #[error("Invalid invite code")]
    InvalidCode,

    #[error("Invite has expired")]
    Expired,

    #[error("Already a member of this server")]
    AlreadyMember,

    #[error("Server not found")]
    ServerNotFound,

    #[error("Permission denied")]
    Forbidden,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for InviteError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(_) => InviteError::InvalidCode,
            AppError::Forbidden(_) => InviteError::Forbidden,
            other => InviteError::Internal(other.to_string()),
        }
    }
}

/// Invite service implementation.
pub struct InviteServiceImpl<I, S, M>
where
    I: InviteRepository,
    S: ServerRepository,
    M: MembershipRepository,
{
    invite_repo: Arc<I>,
    server_repo: Arc<S>,
    membership_repo: Arc<M>,
}

impl<I, S, M> InviteServiceImpl<I, S, M>
where
    I: InviteRepository,
    S: ServerRepository,
    M: MembershipRepository,
{
    pub fn new(invite_repo: Arc<I>, server_repo: Arc<S>, membership_repo: Arc<M>) -> Self {
        Self {
            invite_repo,
            server_repo,
            membership_repo,
        }
    }

    /// Invite management is restricted to the creator and the server owner.
    async fn authorize_manage(&self, invite: &Invite, actor_id: Uuid) -> Result<(), InviteError> {
        if invite.created_by == actor_id {
            return Ok(());
        }

        let actor = self
            .membership_repo
            .find(invite.server_id, actor_id)
            .await?
            .ok_or(InviteError::Forbidden)?;

        if actor.role != MembershipRole::Owner {
            return Err(InviteError::Forbidden);
        }

        Ok(())
    }
}

#[async_trait]
impl<I, S, M> InviteService for InviteServiceImpl<I, S, M>
where
    I: InviteRepository + 'static,
    S: ServerRepository + 'static,
    M: MembershipRepository + 'static,
{
    async fn create_invite(
        &self,
        request: CreateInviteDto,
        inviter_id: Uuid,
    ) -> Result<InviteDto, InviteError> {
        if let Some(max_uses) = request.max_uses {
            if max_uses <= 0 {
                return Err(InviteError::BadRequest(
                    "max_uses must be positive".to_string(),
                ));
            }
        }
        if let Some(hours) = request.expires_in_hours {
            if hours <= 0 {
                return Err(InviteError::BadRequest(
                    "expires_in_hours must be positive".to_string(),
                ));
            }
        }

        self.server_repo
            .find_by_id(request.server_id)
            .await?
            .ok_or(InviteError::ServerNotFound)?;

        // Any member may create invites.
        let is_member = self
            .membership_repo
            .is_member(request.server_id, inviter_id)
            .await?;
        if !is_member {
            return Err(InviteError::Forbidden);
        }

        // Retry on code collision; the unique constraint is the arbiter.
        const MAX_ATTEMPTS: u32 = 5;
        let mut attempts = 0;
        loop {
            let invite = Invite::new(
                request.server_id,
                inviter_id,
                request.max_uses,
                request.expires_in_hours,
            );

            match self.invite_repo.create(&invite).await {
                Ok(created) => {
                    tracing::info!(code = %created.code, server_id = %created.server_id, "Created invite");
                    return Ok(InviteDto::from_invite(created));
                }
                Err(AppError::Conflict(_)) if attempts < MAX_ATTEMPTS => {
                    attempts += 1;
                    tracing::debug!(attempts, "Invite code collision, regenerating");
                }
                Err(AppError::Conflict(_)) => {
                    return Err(InviteError::Internal(
                        "Failed to generate unique invite code".to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn get_invite(&self, code: &str) -> Result<InviteDto, InviteError> {
        let invite = self
            .invite_repo
            .find_by_code(code)
            .await?
            .ok_or(InviteError::InvalidCode)?;

        Ok(InviteDto::from_invite(invite))
    }

    async fn get_server_invites(&self, server_id: Uuid) -> Result<Vec<InviteDto>, InviteError> {
        let invites = self.invite_repo.find_by_server(server_id).await?;
        Ok(invites.into_iter().map(InviteDto::from_invite).collect())
    }

    async fn get_user_invites(&self, user_id: Uuid) -> Result<Vec<InviteDto>, InviteError> {
        let invites = self.invite_repo.find_by_creator(user_id).await?;
        Ok(invites.into_iter().map(InviteDto::from_invite).collect())
    }

    async fn accept_invite(&self, code: &str, user_id: Uuid) -> Result<MemberDto, InviteError> {
        match self.invite_repo.consume(code, user_id).await? {
            ConsumeOutcome::Joined(membership) => {
                metrics::INVITE_CONSUMED.with_label_values(&["joined"]).inc();
                tracing::info!(%code, %user_id, server_id = %membership.server_id, "Invite accepted");
                Ok(MemberDto::from_membership(membership))
            }
            ConsumeOutcome::AlreadyMember => {
                metrics::INVITE_CONSUMED
                    .with_label_values(&["already_member"])
                    .inc();
                Err(InviteError::AlreadyMember)
            }
            ConsumeOutcome::Expired => {
                metrics::INVITE_CONSUMED.with_label_values(&["expired"]).inc();
                Err(InviteError::Expired)
            }
            ConsumeOutcome::NotFound => {
                metrics::INVITE_CONSUMED
                    .with_label_values(&["not_found"])
                    .inc();
                Err(InviteError::InvalidCode)
            }
        }
    }

    async fn revoke_invite(&self, invite_id: Uuid, actor_id: Uuid) -> Result<(), InviteError> {
        let invite = self
            .invite_repo
            .find_by_id(invite_id)
            .await?
            .ok_or(InviteError::InvalidCode)?;

        self.authorize_manage(&invite, actor_id).await?;

        self.invite_repo.deactivate(invite_id).await?;

        tracing::info!(%invite_id, %actor_id, "Revoked invite");

        Ok(())
    }

    async fn delete_invite(&self, invite_id: Uuid, actor_id: Uuid) -> Result<(), InviteError> {
        let invite = self
            .invite_repo
            .find_by_id(invite_id)
            .await?
            .ok_or(InviteError::InvalidCode)?;

        self.authorize_manage(&invite, actor_id).await?;

        self.invite_repo.delete(invite_id).await?;

        tracing::info!(%invite_id, %actor_id, "Deleted invite");

        Ok(())
    }

    async fn validate_invite(&self, code: &str) -> Result<InviteValidationDto, InviteError> {
        let invite = self
            .invite_repo
            .find_by_code(code)
            .await?
            .ok_or(InviteError::InvalidCode)?;

        let now = Utc::now();
        Ok(InviteValidationDto {
            code: invite.code.clone(),
            is_valid: invite.is_valid(now),
            remaining_uses: invite.max_uses.map(|max| (max - invite.current_uses).max(0)),
            expires_in: invite
                .expires_at
                .map(|at| (at - now).num_seconds().max(0)),
        })
    }
}
