//! Moderation Service
//!
//! Moderation actions are plain values executed against the repositories.
//! Each successful action captures the state it destroyed as a `Reversal`
//! and pushes it onto a bounded history; `undo_last` pops the newest entry
//! and applies its reversal. The history drops its oldest entry when full,
//! so very old actions simply become permanent.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::application::events::OutboundEvent;
use crate::application::observers::MessageObserver;
use crate::domain::entities::{
    ChannelRepository, Membership, MembershipRepository, Message, MessageRepository,
};
use crate::domain::services::PermissionService;
use crate::domain::value_objects::MembershipRole;
use crate::infrastructure::metrics;
use crate::infrastructure::pubsub::PubSub;
use crate::shared::error::AppError;

/// Default bound on the undo history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A moderation action as data. Authority is checked by the service before
/// execution; the action itself assumes it is allowed to run.
#[derive(Debug, Clone)]
pub enum ModerationAction {
    Kick,
    Ban,
    /// A duration of zero lifts the mute.
    Mute { duration_minutes: i64 },
    DeleteMessage { message_id: i64 },
    /// Delete the newest messages of one channel.
    ClearMessages { count: i64 },
    /// Add a user to the server as MEMBER.
    JoinServer,
}

impl ModerationAction {
    pub fn name(&self) -> &'static str {
        match self {
            ModerationAction::Kick => "kick",
            ModerationAction::Ban => "ban",
            ModerationAction::Mute { duration_minutes } if *duration_minutes == 0 => "unmute",
            ModerationAction::Mute { .. } => "mute",
            ModerationAction::DeleteMessage { .. } => "delete_message",
            ModerationAction::ClearMessages { .. } => "clear",
            ModerationAction::JoinServer => "join_server",
        }
    }

    /// Minimum role required to execute this action.
    pub fn required_role(&self) -> MembershipRole {
        match self {
            ModerationAction::Ban => MembershipRole::Admin,
            _ => MembershipRole::Moderator,
        }
    }
}

/// The state captured by an executed action, sufficient to put it back.
#[derive(Debug, Clone)]
pub enum Reversal {
    /// Re-insert a removed membership (undoes kick and ban).
    RestoreMembership(Membership),
    /// Restore the previous mute window (undoes mute and unmute).
    RestoreMuteState {
        server_id: Uuid,
        user_id: Uuid,
        mute_until: Option<DateTime<Utc>>,
    },
    /// Re-insert a deleted message.
    RestoreMessage(Message),
    /// Re-insert a batch of cleared messages.
    RestoreMessages(Vec<Message>),
    /// Remove a membership added by the action (undoes join).
    RemoveMembership { server_id: Uuid, user_id: Uuid },
}

/// One entry in the undo history.
#[derive(Debug, Clone)]
pub struct ExecutedAction {
    pub name: &'static str,
    pub reversal: Reversal,
    pub executed_at: DateTime<Utc>,
}

/// Bounded LIFO of executed actions.
pub struct CommandInvoker {
    history: Mutex<VecDeque<ExecutedAction>>,
    limit: usize,
}

impl CommandInvoker {
    pub fn new(limit: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT))),
            limit: limit.max(1),
        }
    }

    /// Record an executed action, evicting the oldest entry when full.
    pub fn record(&self, action: ExecutedAction) {
        let mut history = self.history.lock();
        if history.len() == self.limit {
            history.pop_front();
        }
        history.push_back(action);
    }

    /// Pop the most recent action, if any.
    pub fn pop(&self) -> Option<ExecutedAction> {
        self.history.lock().pop_back()
    }

    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }
}

impl Default for CommandInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

/// Moderation service trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationService: Send + Sync {
    /// Remove a member. Requires MODERATOR and a lower-ranked target.
    async fn kick_user(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), ModerationError>;

    /// Remove a member. Requires ADMIN and a lower-ranked target.
    async fn ban_user(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), ModerationError>;

    /// Mute a member for a duration; zero minutes lifts the mute.
    async fn mute_user(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
        duration_minutes: i64,
    ) -> Result<(), ModerationError>;

    /// Delete any member's message. Requires MODERATOR.
    async fn delete_message(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        message_id: i64,
    ) -> Result<(), ModerationError>;

    /// Delete the newest `count` messages of a channel in the server.
    /// Requires MODERATOR. Returns how many were deleted.
    async fn clear_messages(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        channel_id: Uuid,
        count: i64,
    ) -> Result<u64, ModerationError>;

    /// Add a user to the server as MEMBER. Requires MODERATOR.
    async fn join_server(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), ModerationError>;

    /// Undo the most recent action. Returns the undone action's name, or
    /// None when the history is empty.
    async fn undo_last(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Option<&'static str>, ModerationError>;
}

/// Moderation service errors.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("Not a member of this server")]
    NotAMember,

    #[error("Target is not a member of this server")]
    TargetNotFound,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Channel not found")]
    ChannelNotFound,

    #[error("Permission denied")]
    Forbidden,

    #[error("Invalid duration")]
    InvalidDuration,

    #[error("Target is already a member")]
    AlreadyMember,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for ModerationError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(_) => ModerationError::TargetNotFound,
            AppError::Conflict(_) => ModerationError::AlreadyMember,
            AppError::Forbidden(_) => ModerationError::Forbidden,
            other => ModerationError::Internal(other.to_string()),
        }
    }
}

/// Moderation service implementation.
pub struct ModerationServiceImpl<M, R, C, P>
where
    M: MembershipRepository,
    R: MessageRepository,
    C: ChannelRepository,
    P: PubSub,
{
    membership_repo: Arc<M>,
    message_repo: Arc<R>,
    channel_repo: Arc<C>,
    pubsub: Arc<P>,
    invoker: Arc<CommandInvoker>,
    observers: Vec<Arc<dyn MessageObserver>>,
}

impl<M, R, C, P> ModerationServiceImpl<M, R, C, P>
where
    M: MembershipRepository,
    R: MessageRepository,
    C: ChannelRepository,
    P: PubSub,
{
    pub fn new(
        membership_repo: Arc<M>,
        message_repo: Arc<R>,
        channel_repo: Arc<C>,
        pubsub: Arc<P>,
        invoker: Arc<CommandInvoker>,
        observers: Vec<Arc<dyn MessageObserver>>,
    ) -> Self {
        Self {
            membership_repo,
            message_repo,
            channel_repo,
            pubsub,
            invoker,
            observers,
        }
    }

    /// Walk the observer list for a deletion; failures are logged and skipped.
    async fn notify_observers_deleted(&self, message_id: i64, channel_id: Uuid) {
        for observer in &self.observers {
            if let Err(e) = observer.message_deleted(message_id, channel_id).await {
                tracing::warn!(observer = observer.name(), error = %e, "Observer failed on delete");
            }
        }
    }

    /// Load the actor's membership and check it meets the action's floor.
    async fn authorize(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        action: &ModerationAction,
    ) -> Result<Membership, ModerationError> {
        let actor = self
            .membership_repo
            .find(server_id, actor_id)
            .await?
            .ok_or(ModerationError::NotAMember)?;

        if !PermissionService::meets(&actor, action.required_role()) {
            return Err(ModerationError::Forbidden);
        }

        Ok(actor)
    }

    /// Additionally require a strictly lower-ranked target.
    async fn authorize_against_target(
        &self,
        server_id: Uuid,
        actor: &Membership,
        target_id: Uuid,
    ) -> Result<Membership, ModerationError> {
        let target = self
            .membership_repo
            .find(server_id, target_id)
            .await?
            .ok_or(ModerationError::TargetNotFound)?;

        if !PermissionService::can_moderate_target(actor, &target) {
            return Err(ModerationError::Forbidden);
        }

        Ok(target)
    }

    async fn remove_member(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
        action: ModerationAction,
    ) -> Result<(), ModerationError> {
        let actor = self.authorize(server_id, actor_id, &action).await?;
        self.authorize_against_target(server_id, &actor, target_id)
            .await?;

        let removed = self
            .membership_repo
            .delete(server_id, target_id)
            .await?
            .ok_or(ModerationError::TargetNotFound)?;

        let name = action.name();
        self.invoker.record(ExecutedAction {
            name,
            reversal: Reversal::RestoreMembership(removed),
            executed_at: Utc::now(),
        });

        // Tell the removed user's gateway; a failed push must not roll back
        // the removal.
        let event = OutboundEvent::MemberRemove {
            server_id,
            user_id: target_id,
        };
        if let Ok(payload) = serde_json::to_string(&event) {
            if let Err(e) = self.pubsub.publish_to_user(target_id, &payload).await {
                tracing::warn!(error = %e, "Failed to push member removal");
            }
        }

        metrics::MODERATION_ACTIONS.with_label_values(&[name]).inc();
        tracing::info!(%server_id, %actor_id, %target_id, action = name, "Member removed");

        Ok(())
    }
}

#[async_trait]
impl<M, R, C, P> ModerationService for ModerationServiceImpl<M, R, C, P>
where
    M: MembershipRepository + 'static,
    R: MessageRepository + 'static,
    C: ChannelRepository + 'static,
    P: PubSub + 'static,
{
    async fn kick_user(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), ModerationError> {
        self.remove_member(server_id, actor_id, target_id, ModerationAction::Kick)
            .await
    }

    async fn ban_user(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), ModerationError> {
        self.remove_member(server_id, actor_id, target_id, ModerationAction::Ban)
            .await
    }

    async fn mute_user(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
        duration_minutes: i64,
    ) -> Result<(), ModerationError> {
        if duration_minutes < 0 {
            return Err(ModerationError::InvalidDuration);
        }

        let action = ModerationAction::Mute { duration_minutes };
        let actor = self.authorize(server_id, actor_id, &action).await?;
        self.authorize_against_target(server_id, &actor, target_id)
            .await?;

        let mute_until = if duration_minutes == 0 {
            None
        } else {
            Some(Utc::now() + Duration::minutes(duration_minutes))
        };

        let prior = self
            .membership_repo
            .set_mute(server_id, target_id, mute_until)
            .await?;

        let name = action.name();
        self.invoker.record(ExecutedAction {
            name,
            reversal: Reversal::RestoreMuteState {
                server_id,
                user_id: target_id,
                mute_until: prior.mute_until,
            },
            executed_at: Utc::now(),
        });

        metrics::MODERATION_ACTIONS.with_label_values(&[name]).inc();
        tracing::info!(%server_id, %target_id, duration_minutes, action = name, "Mute state changed");

        Ok(())
    }

    async fn delete_message(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        message_id: i64,
    ) -> Result<(), ModerationError> {
        let action = ModerationAction::DeleteMessage { message_id };
        self.authorize(server_id, actor_id, &action).await?;

        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(ModerationError::MessageNotFound)?;

        // The message must live in the server the actor moderates.
        let channel = self
            .channel_repo
            .find_by_id(message.channel_id)
            .await?
            .ok_or(ModerationError::MessageNotFound)?;
        if channel.server_id != server_id {
            return Err(ModerationError::Forbidden);
        }

        let removed = self
            .message_repo
            .delete(message_id)
            .await?
            .ok_or(ModerationError::MessageNotFound)?;

        // The same observer pass the author path runs: notification cleanup
        // first, then the gateway's MESSAGE_DELETE push.
        self.notify_observers_deleted(removed.id, removed.channel_id)
            .await;

        self.invoker.record(ExecutedAction {
            name: action.name(),
            reversal: Reversal::RestoreMessage(removed),
            executed_at: Utc::now(),
        });

        metrics::MODERATION_ACTIONS
            .with_label_values(&[action.name()])
            .inc();
        metrics::MESSAGES_DELETED
            .with_label_values(&["moderation"])
            .inc();

        Ok(())
    }

    async fn clear_messages(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        channel_id: Uuid,
        count: i64,
    ) -> Result<u64, ModerationError> {
        let count = count.clamp(1, 100);
        let action = ModerationAction::ClearMessages { count };
        self.authorize(server_id, actor_id, &action).await?;

        // The channel must belong to the server the actor moderates.
        let channel = self
            .channel_repo
            .find_by_id(channel_id)
            .await?
            .ok_or(ModerationError::ChannelNotFound)?;
        if channel.server_id != server_id {
            return Err(ModerationError::Forbidden);
        }

        let batch = self
            .message_repo
            .find_by_channel(channel_id, None, count)
            .await?;

        let mut removed = Vec::with_capacity(batch.len());
        for message in batch {
            if let Some(gone) = self.message_repo.delete(message.id).await? {
                self.notify_observers_deleted(gone.id, gone.channel_id).await;
                removed.push(gone);
            }
        }

        let deleted = removed.len() as u64;
        if !removed.is_empty() {
            self.invoker.record(ExecutedAction {
                name: action.name(),
                reversal: Reversal::RestoreMessages(removed),
                executed_at: Utc::now(),
            });
        }

        metrics::MODERATION_ACTIONS
            .with_label_values(&[action.name()])
            .inc();
        metrics::MESSAGES_DELETED
            .with_label_values(&["moderation"])
            .inc_by(deleted);
        tracing::info!(%server_id, %actor_id, %channel_id, deleted, "Cleared channel messages");

        Ok(deleted)
    }

    async fn join_server(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), ModerationError> {
        let action = ModerationAction::JoinServer;
        self.authorize(server_id, actor_id, &action).await?;

        let membership = Membership::new(server_id, target_id, MembershipRole::Member);
        self.membership_repo.create(&membership).await?;

        self.invoker.record(ExecutedAction {
            name: action.name(),
            reversal: Reversal::RemoveMembership {
                server_id,
                user_id: target_id,
            },
            executed_at: Utc::now(),
        });

        metrics::MODERATION_ACTIONS
            .with_label_values(&[action.name()])
            .inc();

        Ok(())
    }

    async fn undo_last(
        &self,
        server_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Option<&'static str>, ModerationError> {
        let actor = self
            .membership_repo
            .find(server_id, actor_id)
            .await?
            .ok_or(ModerationError::NotAMember)?;

        if !PermissionService::meets(&actor, MembershipRole::Moderator) {
            return Err(ModerationError::Forbidden);
        }

        let Some(executed) = self.invoker.pop() else {
            return Ok(None);
        };

        match executed.reversal {
            Reversal::RestoreMembership(membership) => {
                match self.membership_repo.create(&membership).await {
                    Ok(_) => {}
                    // The user already rejoined; the undo has nothing to add.
                    Err(AppError::Conflict(_)) => {
                        tracing::debug!(user_id = %membership.user_id, "Membership already restored");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Reversal::RestoreMuteState {
                server_id,
                user_id,
                mute_until,
            } => {
                self.membership_repo
                    .set_mute(server_id, user_id, mute_until)
                    .await?;
            }
            Reversal::RestoreMessage(message) => {
                self.message_repo.create(&message).await?;
            }
            Reversal::RestoreMessages(messages) => {
                for message in &messages {
                    self.message_repo.create(message).await?;
                }
            }
            Reversal::RemoveMembership { server_id, user_id } => {
                self.membership_repo.delete(server_id, user_id).await?;
            }
        }

        metrics::UNDONE_ACTIONS
            .with_label_values(&[executed.name])
            .inc();
        tracing::info!(%server_id, %actor_id, action = executed.name, "Undid moderation action");

        Ok(Some(executed.name))
    }
}
