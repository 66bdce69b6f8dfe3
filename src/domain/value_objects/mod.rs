//! Immutable value types used across the domain.

mod delivery;
mod role;

pub use delivery::DeliveryRoute;
pub use role::MembershipRole;
