pub mod channel;
pub mod invite;
pub mod membership;
pub mod message;
pub mod notification;
pub mod server;
pub mod user;

pub use channel::{Channel, ChannelRepository, ChannelType};
pub use invite::{ConsumeOutcome, Invite, InviteRepository, CODE_ALPHABET, CODE_LENGTH};
pub use membership::{Membership, MembershipRepository};
pub use message::{Message, MessageRepository};
pub use notification::{Notification, NotificationKind, NotificationRepository};
pub use server::{Server, ServerRepository};
pub use user::{User, UserRepository};
