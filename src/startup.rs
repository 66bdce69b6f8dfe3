//! Engine Startup
//!
//! Builds the full engine from settings: connection pools, repositories,
//! the fixed observer list and the services, wired in dependency order.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::application::observers::{GatewayObserver, MessageObserver, NotificationObserver};
use crate::application::services::{
    CommandInvoker, InviteServiceImpl, MessageServiceImpl, ModerationServiceImpl, PresenceService,
    ServerServiceImpl, SlashCommandServiceImpl,
};
use crate::config::Settings;
use crate::infrastructure::database::{create_pool, run_migrations};
use crate::infrastructure::presence::PresenceTracker;
use crate::infrastructure::pubsub::RedisPubSub;
use crate::infrastructure::repositories::{
    PgChannelRepository, PgInviteRepository, PgMembershipRepository, PgMessageRepository,
    PgNotificationRepository, PgServerRepository, PgUserRepository,
};
use crate::shared::snowflake::SnowflakeGenerator;

pub type PgServerService = ServerServiceImpl<PgServerRepository, PgMembershipRepository>;
pub type PgInviteService =
    InviteServiceImpl<PgInviteRepository, PgServerRepository, PgMembershipRepository>;
pub type PgMessageService = MessageServiceImpl<
    PgChannelRepository,
    PgMembershipRepository,
    PgMessageRepository,
    RedisPubSub,
>;
pub type PgModerationService = ModerationServiceImpl<
    PgMembershipRepository,
    PgMessageRepository,
    PgChannelRepository,
    RedisPubSub,
>;
pub type PgSlashCommandService = SlashCommandServiceImpl<
    PgModerationService,
    PgServerService,
    PgMembershipRepository,
    PgUserRepository,
>;

/// The assembled chat engine: every service, sharing one pool and one
/// transport.
pub struct ChatEngine {
    pub settings: Settings,
    pub pool: PgPool,
    pub servers: Arc<PgServerService>,
    pub invites: Arc<PgInviteService>,
    pub messages: Arc<PgMessageService>,
    pub moderation: Arc<PgModerationService>,
    pub slash_commands: Arc<PgSlashCommandService>,
    pub presence: Arc<PresenceService>,
}

impl ChatEngine {
    /// Build the engine: connect, migrate and wire everything together.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let pool = create_pool(&settings.database)
            .await
            .context("Failed to connect to PostgreSQL")?;
        run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;

        let redis_client = redis::Client::open(settings.redis.url.as_str())
            .context("Invalid Redis URL")?;
        let redis_conn = redis::aio::ConnectionManager::new(redis_client)
            .await
            .context("Failed to connect to Redis")?;
        let pubsub = Arc::new(RedisPubSub::new(redis_conn));

        let user_repo = Arc::new(PgUserRepository::new(pool.clone()));
        let server_repo = Arc::new(PgServerRepository::new(pool.clone()));
        let channel_repo = Arc::new(PgChannelRepository::new(pool.clone()));
        let membership_repo = Arc::new(PgMembershipRepository::new(pool.clone()));
        let message_repo = Arc::new(PgMessageRepository::new(pool.clone()));
        let invite_repo = Arc::new(PgInviteRepository::new(pool.clone()));
        let notification_repo = Arc::new(PgNotificationRepository::new(pool.clone()));

        let presence = Arc::new(PresenceService::new(
            Arc::new(PresenceTracker::new()),
            membership_repo.clone(),
            pubsub.clone(),
        ));
        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
            settings.snowflake.epoch,
        ));

        // Fixed observer order: notifications first, gateway pushes second.
        let observers: Vec<Arc<dyn MessageObserver>> = vec![
            Arc::new(NotificationObserver::new(
                notification_repo,
                user_repo.clone(),
            )),
            Arc::new(GatewayObserver::new(pubsub.clone())),
        ];

        let servers = Arc::new(ServerServiceImpl::new(
            server_repo.clone(),
            membership_repo.clone(),
        ));
        let invites = Arc::new(InviteServiceImpl::new(
            invite_repo,
            server_repo,
            membership_repo.clone(),
        ));
        let messages = Arc::new(MessageServiceImpl::new(
            channel_repo.clone(),
            membership_repo.clone(),
            message_repo.clone(),
            pubsub.clone(),
            presence.clone(),
            snowflake,
            observers.clone(),
        ));
        let invoker = Arc::new(CommandInvoker::new(settings.moderation.history_limit));
        let moderation = Arc::new(ModerationServiceImpl::new(
            membership_repo.clone(),
            message_repo,
            channel_repo,
            pubsub,
            invoker,
            observers,
        ));
        let slash_commands = Arc::new(SlashCommandServiceImpl::new(
            moderation.clone(),
            servers.clone(),
            membership_repo,
            user_repo,
        ));

        tracing::info!(environment = %settings.environment, "Engine assembled");

        Ok(Self {
            settings,
            pool,
            servers,
            invites,
            messages,
            moderation,
            slash_commands,
            presence,
        })
    }
}
