//! Membership entity and repository trait.
//!
//! The membership row is the authority record binding one user to one
//! server. At most one row exists per (user, server) pair, enforced by a
//! unique constraint, and every server has exactly one OWNER row created
//! atomically with the server itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::MembershipRole;
use crate::shared::error::AppError;

/// A user's membership in a server, carrying role and mute state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,

    pub server_id: Uuid,

    pub user_id: Uuid,

    pub role: MembershipRole,

    /// Server-specific nickname, if any
    pub nickname: Option<String>,

    /// End of the current mute window. None or a past instant means unmuted.
    pub mute_until: Option<DateTime<Utc>>,

    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(server_id: Uuid, user_id: Uuid, role: MembershipRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            server_id,
            user_id,
            role,
            nickname: None,
            mute_until: None,
            joined_at: Utc::now(),
        }
    }

    /// True strictly while `now < mute_until`; false at and after the boundary.
    pub fn is_muted(&self, now: DateTime<Utc>) -> bool {
        self.mute_until.map_or(false, |until| now < until)
    }
}

/// Repository trait for membership data access.
///
/// Mutating operations that read existing state (`set_mute`, `set_nickname`)
/// must lock the row for the duration of the transaction so concurrent
/// moderators cannot lose each other's updates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Find the membership for a (server, user) pair.
    async fn find(&self, server_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, AppError>;

    /// All memberships of a server.
    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Membership>, AppError>;

    /// All memberships of a user (the servers they belong to).
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError>;

    /// Insert a membership. A duplicate (user, server) pair yields
    /// `AppError::Conflict` via the unique constraint.
    async fn create(&self, membership: &Membership) -> Result<Membership, AppError>;

    /// Delete a membership, returning the removed row if it existed.
    async fn delete(&self, server_id: Uuid, user_id: Uuid)
        -> Result<Option<Membership>, AppError>;

    /// Set (or clear) the mute window, returning the row as it was BEFORE
    /// the update. `NotFound` if the pair has no membership.
    async fn set_mute(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        mute_until: Option<DateTime<Utc>>,
    ) -> Result<Membership, AppError>;

    /// Set (or clear) the nickname, returning the updated row.
    async fn set_nickname(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        nickname: Option<String>,
    ) -> Result<Membership, AppError>;

    /// Check whether a user is a member of a server.
    async fn is_member(&self, server_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    /// Member count for a server.
    async fn count_by_server(&self, server_id: Uuid) -> Result<i64, AppError>;
}
