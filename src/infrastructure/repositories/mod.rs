//! Repository Implementations
//!
//! PostgreSQL-backed implementations of the domain repository traits.

pub mod channel_repository;
pub mod invite_repository;
pub mod membership_repository;
pub mod message_repository;
pub mod notification_repository;
pub mod server_repository;
pub mod user_repository;

pub use channel_repository::PgChannelRepository;
pub use invite_repository::PgInviteRepository;
pub use membership_repository::PgMembershipRepository;
pub use message_repository::PgMessageRepository;
pub use notification_repository::PgNotificationRepository;
pub use server_repository::PgServerRepository;
pub use user_repository::PgUserRepository;
