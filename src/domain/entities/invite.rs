//! Invite entity and repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

use super::Membership;

/// Alphabet invite codes are drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fixed invite code length.
pub const CODE_LENGTH: usize = 8;

/// A limited-use, optionally time-boxed token granting server membership.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invite {
    pub id: Uuid,

    /// Unique 8-character code (A-Z, 0-9)
    pub code: String,

    pub server_id: Uuid,

    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    /// None means the invite never expires
    pub expires_at: Option<DateTime<Utc>>,

    /// None means unlimited uses
    pub max_uses: Option<i32>,

    pub current_uses: i32,

    /// Cleared on revocation or when the use cap is reached
    pub is_active: bool,
}

impl Invite {
    pub fn new(
        server_id: Uuid,
        created_by: Uuid,
        max_uses: Option<i32>,
        expires_in_hours: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: Self::generate_code(),
            server_id,
            created_by,
            created_at: now,
            expires_at: expires_in_hours.map(|h| now + Duration::hours(h)),
            max_uses,
            current_uses: 0,
            is_active: true,
        }
    }

    /// Validity is a pure function of state, never stored.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(expires_at) = self.expires_at {
            if now >= expires_at {
                return false;
            }
        }
        if let Some(max_uses) = self.max_uses {
            if self.current_uses >= max_uses {
                return false;
            }
        }
        true
    }

    /// Draw a random code from the fixed alphabet.
    pub fn generate_code() -> String {
        use rand::Rng;

        let mut rng = rand::rng();
        (0..CODE_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CODE_ALPHABET.len());
                CODE_ALPHABET[idx] as char
            })
            .collect()
    }
}

/// Result of attempting to consume an invite code.
///
/// Consumption is a single storage transaction: the invite row is locked,
/// re-validated, the membership inserted and the use-count incremented
/// together, so a partially applied accept is never observable.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// The user joined; carries the created MEMBER membership.
    Joined(Membership),
    /// A membership for the pair already exists.
    AlreadyMember,
    /// The invite exists but is inactive, expired or at its use cap.
    Expired,
    /// No invite with that code.
    NotFound,
}

/// Repository trait for invite data access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InviteRepository: Send + Sync {
    /// Find an invite by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invite>, AppError>;

    /// Find an invite by its code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Invite>, AppError>;

    /// All invites of a server, newest first.
    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Invite>, AppError>;

    /// All invites created by a user.
    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Invite>, AppError>;

    /// Insert an invite. A code collision yields `AppError::Conflict` via the
    /// unique constraint; the caller retries with a fresh code.
    async fn create(&self, invite: &Invite) -> Result<Invite, AppError>;

    /// Atomically consume the invite for `user_id`: lock the row, validate,
    /// insert a MEMBER membership, increment the use-count and deactivate at
    /// the cap — all in one transaction.
    async fn consume(&self, code: &str, user_id: Uuid) -> Result<ConsumeOutcome, AppError>;

    /// Soft-revoke: set `is_active = false`, keep the record.
    async fn deactivate(&self, id: Uuid) -> Result<(), AppError>;

    /// Hard-delete the record.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}
