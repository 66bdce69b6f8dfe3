//! Role-based permission checks.
//!
//! Pure functions over the role ladder; storage access stays with the
//! callers, which hand in the memberships they already loaded.

use crate::domain::entities::Membership;
use crate::domain::value_objects::MembershipRole;

pub struct PermissionService;

impl PermissionService {
    /// Does `actor` hold at least `required` in the server?
    pub fn meets(actor: &Membership, required: MembershipRole) -> bool {
        actor.role.meets(required)
    }

    /// Can `actor` apply a moderation action to `target`?
    ///
    /// Requires strictly higher rank: equal-rank moderation is rejected, and
    /// nobody outranks the owner.
    pub fn can_moderate_target(actor: &Membership, target: &Membership) -> bool {
        actor.role.level() > target.role.level()
    }
}
