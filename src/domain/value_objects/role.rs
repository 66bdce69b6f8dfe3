//! Membership role hierarchy.

use serde::{Deserialize, Serialize};

/// Role a user holds within one server.
///
/// The hierarchy is a total order used for all permission comparisons:
/// OWNER (4) > ADMIN (3) > MODERATOR (2) > MEMBER (1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipRole {
    Owner,
    Admin,
    Moderator,
    Member,
}

impl MembershipRole {
    /// Numeric rank used for `userLevel >= requiredLevel` checks.
    pub fn level(self) -> u8 {
        match self {
            MembershipRole::Owner => 4,
            MembershipRole::Admin => 3,
            MembershipRole::Moderator => 2,
            MembershipRole::Member => 1,
        }
    }

    /// True if a holder of this role may perform an action gated on `required`.
    pub fn meets(self, required: MembershipRole) -> bool {
        self.level() >= required.level()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MembershipRole::Owner => "OWNER",
            MembershipRole::Admin => "ADMIN",
            MembershipRole::Moderator => "MODERATOR",
            MembershipRole::Member => "MEMBER",
        }
    }
}

impl std::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
