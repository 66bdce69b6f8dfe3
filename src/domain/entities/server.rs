//! Server entity and repository trait.
//!
//! A server is the root of one membership domain. It exclusively owns its
//! channels and memberships; deleting a server cascades both.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

use super::Membership;

/// A chat server (community) owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Server {
    pub id: Uuid,

    /// Owner user ID. The owner always holds the single OWNER membership.
    pub owner_id: Uuid,

    pub name: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Server {
    pub fn new(owner_id: Uuid, name: String, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            description,
            created_at: Utc::now(),
        }
    }
}

/// Repository trait for server data access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Find a server by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Server>, AppError>;

    /// Create a server together with its OWNER membership.
    ///
    /// Both rows are inserted in one transaction so a server can never be
    /// observed without exactly one OWNER membership.
    async fn create(&self, server: &Server, owner_membership: &Membership)
        -> Result<Server, AppError>;

    /// Delete a server. Channels, memberships and invites cascade.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}
