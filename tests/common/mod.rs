//! Shared test fixtures: in-memory repositories wired into the real
//! services. Everything is synchronous under the hood, so one parking_lot
//! lock per store is enough to make the multi-step operations atomic.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use guildhall::application::observers::{
    GatewayObserver, MessageObserver, NotificationObserver,
};
use guildhall::application::services::{
    CommandInvoker, InviteServiceImpl, MessageServiceImpl, ModerationServiceImpl, PresenceService,
    ServerServiceImpl, SlashCommandServiceImpl,
};
use guildhall::domain::entities::{
    Channel, ChannelRepository, ChannelType, ConsumeOutcome, Invite, InviteRepository, Membership,
    MembershipRepository, Message, MessageRepository, Notification, NotificationRepository,
    Server, ServerRepository, User, UserRepository,
};
use guildhall::domain::value_objects::MembershipRole;
use guildhall::infrastructure::presence::PresenceTracker;
use guildhall::infrastructure::pubsub::MemoryPubSub;
use guildhall::shared::error::AppError;
use guildhall::shared::snowflake::SnowflakeGenerator;

// ---------------------------------------------------------------------------
// In-memory repositories
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepository {
    pub fn insert(&self, user: User) {
        self.users.write().insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryMembershipRepository {
    rows: RwLock<HashMap<(Uuid, Uuid), Membership>>,
}

impl MemoryMembershipRepository {
    /// Insert without the async trait, for callers holding their own lock.
    fn insert_if_absent(&self, membership: &Membership) -> bool {
        let key = (membership.server_id, membership.user_id);
        let mut rows = self.rows.write();
        if rows.contains_key(&key) {
            return false;
        }
        rows.insert(key, membership.clone());
        true
    }

    fn contains(&self, server_id: Uuid, user_id: Uuid) -> bool {
        self.rows.read().contains_key(&(server_id, user_id))
    }
}

#[async_trait]
impl MembershipRepository for MemoryMembershipRepository {
    async fn find(&self, server_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, AppError> {
        Ok(self.rows.read().get(&(server_id, user_id)).cloned())
    }

    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let mut members: Vec<Membership> = self
            .rows
            .read()
            .values()
            .filter(|m| m.server_id == server_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError> {
        Ok(self
            .rows
            .read()
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, membership: &Membership) -> Result<Membership, AppError> {
        if self.insert_if_absent(membership) {
            Ok(membership.clone())
        } else {
            Err(AppError::Conflict(
                "User is already a member of this server".to_string(),
            ))
        }
    }

    async fn delete(
        &self,
        server_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        Ok(self.rows.write().remove(&(server_id, user_id)))
    }

    async fn set_mute(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        mute_until: Option<DateTime<Utc>>,
    ) -> Result<Membership, AppError> {
        let mut rows = self.rows.write();
        let row = rows
            .get_mut(&(server_id, user_id))
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;
        let prior = row.clone();
        row.mute_until = mute_until;
        Ok(prior)
    }

    async fn set_nickname(
        &self,
        server_id: Uuid,
        user_id: Uuid,
        nickname: Option<String>,
    ) -> Result<Membership, AppError> {
        let mut rows = self.rows.write();
        let row = rows
            .get_mut(&(server_id, user_id))
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;
        row.nickname = nickname;
        Ok(row.clone())
    }

    async fn is_member(&self, server_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.contains(server_id, user_id))
    }

    async fn count_by_server(&self, server_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .rows
            .read()
            .values()
            .filter(|m| m.server_id == server_id)
            .count() as i64)
    }
}

pub struct MemoryServerRepository {
    servers: RwLock<HashMap<Uuid, Server>>,
    memberships: Arc<MemoryMembershipRepository>,
}

impl MemoryServerRepository {
    pub fn new(memberships: Arc<MemoryMembershipRepository>) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            memberships,
        }
    }
}

#[async_trait]
impl ServerRepository for MemoryServerRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Server>, AppError> {
        Ok(self.servers.read().get(&id).cloned())
    }

    async fn create(
        &self,
        server: &Server,
        owner_membership: &Membership,
    ) -> Result<Server, AppError> {
        let mut servers = self.servers.write();
        if !self.memberships.insert_if_absent(owner_membership) {
            return Err(AppError::Conflict("Owner membership exists".to_string()));
        }
        servers.insert(server.id, server.clone());
        Ok(server.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.servers
            .write()
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Server {} not found", id)))?;
        self.memberships.rows.write().retain(|(sid, _), _| *sid != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryChannelRepository {
    channels: RwLock<HashMap<Uuid, Channel>>,
    participants: RwLock<HashMap<Uuid, Vec<Uuid>>>,
}

#[async_trait]
impl ChannelRepository for MemoryChannelRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Channel>, AppError> {
        Ok(self.channels.read().get(&id).cloned())
    }

    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Channel>, AppError> {
        Ok(self
            .channels
            .read()
            .values()
            .filter(|c| c.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn create(&self, channel: &Channel) -> Result<Channel, AppError> {
        self.channels.write().insert(channel.id, channel.clone());
        Ok(channel.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.channels
            .write()
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", id)))?;
        Ok(())
    }

    async fn participants(&self, channel_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .participants
            .read()
            .get(&channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_participant(&self, channel_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let mut participants = self.participants.write();
        let list = participants.entry(channel_id).or_default();
        if !list.contains(&user_id) {
            list.push(user_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMessageRepository {
    messages: RwLock<HashMap<i64, Message>>,
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.messages.read().get(&id).cloned())
    }

    async fn find_by_channel(
        &self,
        channel_id: Uuid,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| m.channel_id == channel_id)
            .filter(|m| before.map_or(true, |b| m.id < b))
            .cloned()
            .collect();
        messages.sort_by_key(|m| std::cmp::Reverse(m.id));
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn search(
        &self,
        channel_id: Uuid,
        keyword: &str,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let needle = keyword.to_lowercase();
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| m.channel_id == channel_id && m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        messages.sort_by_key(|m| std::cmp::Reverse(m.id));
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        self.messages.write().insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn update_content(
        &self,
        id: i64,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Message, AppError> {
        let mut messages = self.messages.write();
        let message = messages
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;
        message.content = content.to_string();
        message.edited_at = Some(edited_at);
        Ok(message.clone())
    }

    async fn delete(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.messages.write().remove(&id))
    }
}

pub struct MemoryInviteRepository {
    invites: RwLock<HashMap<Uuid, Invite>>,
    memberships: Arc<MemoryMembershipRepository>,
    // Serializes consume so validate + insert + increment happen atomically,
    // the way the row lock does in production.
    consume_lock: Mutex<()>,
}

impl MemoryInviteRepository {
    pub fn new(memberships: Arc<MemoryMembershipRepository>) -> Self {
        Self {
            invites: RwLock::new(HashMap::new()),
            memberships,
            consume_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl InviteRepository for MemoryInviteRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Invite>, AppError> {
        Ok(self.invites.read().get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Invite>, AppError> {
        Ok(self
            .invites
            .read()
            .values()
            .find(|i| i.code == code)
            .cloned())
    }

    async fn find_by_server(&self, server_id: Uuid) -> Result<Vec<Invite>, AppError> {
        Ok(self
            .invites
            .read()
            .values()
            .filter(|i| i.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Invite>, AppError> {
        Ok(self
            .invites
            .read()
            .values()
            .filter(|i| i.created_by == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, invite: &Invite) -> Result<Invite, AppError> {
        let mut invites = self.invites.write();
        if invites.values().any(|i| i.code == invite.code) {
            return Err(AppError::Conflict("Invite code already exists".to_string()));
        }
        invites.insert(invite.id, invite.clone());
        Ok(invite.clone())
    }

    async fn consume(&self, code: &str, user_id: Uuid) -> Result<ConsumeOutcome, AppError> {
        let _guard = self.consume_lock.lock();

        let mut invites = self.invites.write();
        let Some(invite) = invites.values_mut().find(|i| i.code == code) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        if !invite.is_valid(Utc::now()) {
            return Ok(ConsumeOutcome::Expired);
        }

        if self.memberships.contains(invite.server_id, user_id) {
            return Ok(ConsumeOutcome::AlreadyMember);
        }

        let membership = Membership::new(invite.server_id, user_id, MembershipRole::Member);
        self.memberships.insert_if_absent(&membership);

        invite.current_uses += 1;
        if let Some(max) = invite.max_uses {
            if invite.current_uses >= max {
                invite.is_active = false;
            }
        }

        Ok(ConsumeOutcome::Joined(membership))
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        let mut invites = self.invites.write();
        let invite = invites
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Invite {} not found", id)))?;
        invite.is_active = false;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.invites
            .write()
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Invite {} not found", id)))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNotificationRepository {
    rows: RwLock<HashMap<Uuid, Notification>>,
}

impl MemoryNotificationRepository {
    pub fn all(&self) -> Vec<Notification> {
        self.rows.read().values().cloned().collect()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError> {
        self.rows
            .write()
            .insert(notification.id, notification.clone());
        Ok(notification.clone())
    }

    async fn find_unread(&self, recipient_id: Uuid) -> Result<Vec<Notification>, AppError> {
        let mut unread: Vec<Notification> = self
            .rows
            .read()
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .cloned()
            .collect();
        unread.sort_by_key(|n| std::cmp::Reverse(n.created_at));
        Ok(unread)
    }

    async fn mark_read(&self, id: Uuid) -> Result<(), AppError> {
        let mut rows = self.rows.write();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))?;
        row.read = true;
        Ok(())
    }

    async fn delete_by_message(&self, message_id: i64) -> Result<u64, AppError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, n| n.message_id != message_id);
        Ok((before - rows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Engine fixture
// ---------------------------------------------------------------------------

pub type TestServerService = ServerServiceImpl<MemoryServerRepository, MemoryMembershipRepository>;
pub type TestInviteService =
    InviteServiceImpl<MemoryInviteRepository, MemoryServerRepository, MemoryMembershipRepository>;
pub type TestMessageService = MessageServiceImpl<
    MemoryChannelRepository,
    MemoryMembershipRepository,
    MemoryMessageRepository,
    MemoryPubSub,
>;
pub type TestModerationService = ModerationServiceImpl<
    MemoryMembershipRepository,
    MemoryMessageRepository,
    MemoryChannelRepository,
    MemoryPubSub,
>;
pub type TestSlashCommandService = SlashCommandServiceImpl<
    TestModerationService,
    TestServerService,
    MemoryMembershipRepository,
    MemoryUserRepository,
>;

/// Fully wired engine over the in-memory stores.
pub struct TestEngine {
    pub users: Arc<MemoryUserRepository>,
    pub memberships: Arc<MemoryMembershipRepository>,
    pub server_repo: Arc<MemoryServerRepository>,
    pub channels: Arc<MemoryChannelRepository>,
    pub message_repo: Arc<MemoryMessageRepository>,
    pub invite_repo: Arc<MemoryInviteRepository>,
    pub notifications: Arc<MemoryNotificationRepository>,
    pub pubsub: Arc<MemoryPubSub>,
    pub presence: Arc<PresenceService>,
    pub invoker: Arc<CommandInvoker>,

    pub servers: Arc<TestServerService>,
    pub invites: Arc<TestInviteService>,
    pub messages: Arc<TestMessageService>,
    pub moderation: Arc<TestModerationService>,
    pub slash_commands: Arc<TestSlashCommandService>,
}

impl TestEngine {
    pub fn new() -> Self {
        let users = Arc::new(MemoryUserRepository::default());
        let memberships = Arc::new(MemoryMembershipRepository::default());
        let server_repo = Arc::new(MemoryServerRepository::new(memberships.clone()));
        let channels = Arc::new(MemoryChannelRepository::default());
        let message_repo = Arc::new(MemoryMessageRepository::default());
        let invite_repo = Arc::new(MemoryInviteRepository::new(memberships.clone()));
        let notifications = Arc::new(MemoryNotificationRepository::default());
        let pubsub = Arc::new(MemoryPubSub::new());
        let presence = Arc::new(PresenceService::new(
            Arc::new(PresenceTracker::new()),
            memberships.clone(),
            pubsub.clone(),
        ));
        let invoker = Arc::new(CommandInvoker::default());

        let observers: Vec<Arc<dyn MessageObserver>> = vec![
            Arc::new(NotificationObserver::new(
                notifications.clone(),
                users.clone(),
            )),
            Arc::new(GatewayObserver::new(pubsub.clone())),
        ];

        let servers = Arc::new(ServerServiceImpl::new(
            server_repo.clone(),
            memberships.clone(),
        ));
        let invites = Arc::new(InviteServiceImpl::new(
            invite_repo.clone(),
            server_repo.clone(),
            memberships.clone(),
        ));
        let messages = Arc::new(MessageServiceImpl::new(
            channels.clone(),
            memberships.clone(),
            message_repo.clone(),
            pubsub.clone(),
            presence.clone(),
            Arc::new(SnowflakeGenerator::default()),
            observers.clone(),
        ));
        let moderation = Arc::new(ModerationServiceImpl::new(
            memberships.clone(),
            message_repo.clone(),
            channels.clone(),
            pubsub.clone(),
            invoker.clone(),
            observers,
        ));
        let slash_commands = Arc::new(SlashCommandServiceImpl::new(
            moderation.clone(),
            servers.clone(),
            memberships.clone(),
            users.clone(),
        ));

        Self {
            users,
            memberships,
            server_repo,
            channels,
            message_repo,
            invite_repo,
            notifications,
            pubsub,
            presence,
            invoker,
            servers,
            invites,
            messages,
            moderation,
            slash_commands,
        }
    }

    /// Register a user account.
    pub fn add_user(&self, username: &str) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: None,
            avatar_url: None,
            created_at: Utc::now(),
        };
        let id = user.id;
        self.users.insert(user);
        id
    }

    /// Create a server owned by `owner_id`, returning its ID.
    pub async fn add_server(&self, owner_id: Uuid) -> Uuid {
        let server = Server::new(owner_id, "test-server".to_string(), None);
        let owner_membership = Membership::new(server.id, owner_id, MembershipRole::Owner);
        self.server_repo
            .create(&server, &owner_membership)
            .await
            .expect("server creation");
        server.id
    }

    /// Create a channel in a server.
    pub async fn add_channel(&self, server_id: Uuid, kind: ChannelType) -> Uuid {
        let channel = Channel::new(server_id, "general".to_string(), kind);
        self.channels.create(&channel).await.expect("channel creation");
        channel.id
    }

    /// Add a user to a server with a role.
    pub async fn add_member(&self, server_id: Uuid, user_id: Uuid, role: MembershipRole) {
        let membership = Membership::new(server_id, user_id, role);
        self.memberships
            .create(&membership)
            .await
            .expect("membership creation");
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
