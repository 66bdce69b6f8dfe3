//! User entity and repository trait.
//!
//! Users are owned by the account subsystem. This core only reads them to
//! resolve authors, invite creators and slash-command targets; it never
//! mutates an account.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// A user account, as visible to the chat core.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique login/mention name (what `@name` resolves against)
    pub username: String,

    /// Optional display name shown instead of the username
    pub display_name: Option<String>,

    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Read-only repository over user accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Find a user by exact username (mention resolution).
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}
