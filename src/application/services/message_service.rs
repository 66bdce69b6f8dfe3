//! Message Service
//!
//! The message lifecycle: authority checks, persistence, the ordered
//! observer pass and delivery routing. Every message takes exactly one
//! delivery route, decided by the channel type.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::application::events::{MessagePayload, OutboundEvent};
use crate::application::observers::MessageObserver;
use crate::application::services::PresenceService;
use crate::domain::entities::{
    Channel, ChannelRepository, ChannelType, MembershipRepository, Message, MessageRepository,
};
use crate::domain::value_objects::{DeliveryRoute, MembershipRole};
use crate::infrastructure::metrics;
use crate::infrastructure::pubsub::{announcement_topic, channel_topic, PubSub};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Maximum message content length in characters.
pub const MAX_CONTENT_LENGTH: usize = 2000;

/// Message service trait defining the message lifecycle.
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Create a message in a channel and deliver it.
    async fn create_message(
        &self,
        request: CreateMessageDto,
        author_id: Uuid,
    ) -> Result<MessageDto, MessageError>;

    /// Edit a message's content. Author only.
    async fn edit_message(
        &self,
        message_id: i64,
        actor_id: Uuid,
        content: String,
    ) -> Result<MessageDto, MessageError>;

    /// Delete a message. Author, or the server owner.
    async fn delete_message(&self, message_id: i64, actor_id: Uuid) -> Result<(), MessageError>;

    /// Channel history, newest first.
    async fn get_history(
        &self,
        channel_id: Uuid,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<MessageDto>, MessageError>;

    /// Search a channel's messages by keyword.
    async fn search(
        &self,
        channel_id: Uuid,
        keyword: &str,
        limit: i64,
    ) -> Result<Vec<MessageDto>, MessageError>;
}

/// Request DTO for creating a message.
#[derive(Debug, Clone)]
pub struct CreateMessageDto {
    pub channel_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<i64>,
}

/// Message data transfer object.
#[derive(Debug, Clone)]
pub struct MessageDto {
    pub id: i64,
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<i64>,
    pub created_at: String,
    pub edited_at: Option<String>,
}

impl MessageDto {
    pub fn from_message(message: Message) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            author_id: message.author_id,
            content: message.content,
            reply_to_id: message.reply_to_id,
            created_at: message.created_at.to_rfc3339(),
            edited_at: message.edited_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Message service errors.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Channel not found")]
    ChannelNotFound,

    #[error("Message not found")]
    NotFound,

    #[error("Not a member of this server")]
    NotAMember,

    #[error("You are muted in this server")]
    Muted,

    #[error("Permission denied")]
    Forbidden,

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for MessageError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(_) => MessageError::NotFound,
            AppError::Forbidden(_) => MessageError::Forbidden,
            other => MessageError::Internal(other.to_string()),
        }
    }
}

/// Message service implementation.
///
/// The observer list is fixed at construction and walked in order for every
/// lifecycle event. An observer error is logged and skipped; it never blocks
/// the remaining observers or the delivery itself.
pub struct MessageServiceImpl<C, M, R, P>
where
    C: ChannelRepository,
    M: MembershipRepository,
    R: MessageRepository,
    P: PubSub,
{
    channel_repo: Arc<C>,
    membership_repo: Arc<M>,
    message_repo: Arc<R>,
    pubsub: Arc<P>,
    presence: Arc<PresenceService>,
    snowflake: Arc<SnowflakeGenerator>,
    observers: Vec<Arc<dyn MessageObserver>>,
}

impl<C, M, R, P> MessageServiceImpl<C, M, R, P>
where
    C: ChannelRepository,
    M: MembershipRepository,
    R: MessageRepository,
    P: PubSub,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel_repo: Arc<C>,
        membership_repo: Arc<M>,
        message_repo: Arc<R>,
        pubsub: Arc<P>,
        presence: Arc<PresenceService>,
        snowflake: Arc<SnowflakeGenerator>,
        observers: Vec<Arc<dyn MessageObserver>>,
    ) -> Self {
        Self {
            channel_repo,
            membership_repo,
            message_repo,
            pubsub,
            presence,
            snowflake,
            observers,
        }
    }

    fn validate_content(content: &str) -> Result<(), MessageError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(MessageError::InvalidContent(
                "Content must not be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(MessageError::InvalidContent(format!(
                "Content exceeds {} characters",
                MAX_CONTENT_LENGTH
            )));
        }
        Ok(())
    }

    /// Authority to post: DM channels require participation, everything else
    /// requires an unmuted membership.
    async fn check_can_post(&self, channel: &Channel, author_id: Uuid) -> Result<(), MessageError> {
        if channel.kind == ChannelType::Dm {
            let participants = self.channel_repo.participants(channel.id).await?;
            if !participants.contains(&author_id) {
                return Err(MessageError::NotAMember);
            }
            return Ok(());
        }

        let membership = self
            .membership_repo
            .find(channel.server_id, author_id)
            .await?
            .ok_or(MessageError::NotAMember)?;

        if membership.is_muted(Utc::now()) {
            return Err(MessageError::Muted);
        }

        Ok(())
    }

    async fn notify_observers_created(&self, message: &Message) {
        for observer in &self.observers {
            if let Err(e) = observer.message_created(message).await {
                tracing::warn!(observer = observer.name(), error = %e, "Observer failed on create");
            }
        }
    }

    async fn notify_observers_updated(&self, message: &Message) {
        for observer in &self.observers {
            if let Err(e) = observer.message_updated(message).await {
                tracing::warn!(observer = observer.name(), error = %e, "Observer failed on update");
            }
        }
    }

    async fn notify_observers_deleted(&self, message_id: i64, channel_id: Uuid) {
        for observer in &self.observers {
            if let Err(e) = observer.message_deleted(message_id, channel_id).await {
                tracing::warn!(observer = observer.name(), error = %e, "Observer failed on delete");
            }
        }
    }

    /// Deliver a new message along the route its channel type selects.
    async fn deliver(&self, channel: &Channel, message: &Message) -> Result<(), MessageError> {
        let route = DeliveryRoute::for_channel(channel.kind);
        let event = OutboundEvent::MessageCreate(MessagePayload::from(message));
        let payload =
            serde_json::to_string(&event).map_err(|e| MessageError::Internal(e.to_string()))?;

        match route {
            DeliveryRoute::ChannelTopic => {
                self.pubsub
                    .publish(&channel_topic(channel.id), &payload)
                    .await?;
            }
            DeliveryRoute::AnnouncementTopic => {
                self.pubsub
                    .publish(&announcement_topic(channel.server_id), &payload)
                    .await?;
            }
            DeliveryRoute::DirectQueues => {
                // Push only to online recipients; offline ones catch up from
                // history on reconnect.
                let participants = self.channel_repo.participants(channel.id).await?;
                for recipient in participants {
                    if recipient == message.author_id {
                        continue;
                    }
                    if self.presence.is_online(recipient) {
                        self.pubsub.publish_to_user(recipient, &payload).await?;
                    }
                }
            }
        }

        metrics::MESSAGES_CREATED
            .with_label_values(&[route.as_str()])
            .inc();

        Ok(())
    }
}

#[async_trait]
impl<C, M, R, P> MessageService for MessageServiceImpl<C, M, R, P>
where
    C: ChannelRepository + 'static,
    M: MembershipRepository + 'static,
    R: MessageRepository + 'static,
    P: PubSub + 'static,
{
    async fn create_message(
        &self,
        request: CreateMessageDto,
        author_id: Uuid,
    ) -> Result<MessageDto, MessageError> {
        let channel = self
            .channel_repo
            .find_by_id(request.channel_id)
            .await?
            .ok_or(MessageError::ChannelNotFound)?;

        self.check_can_post(&channel, author_id).await?;
        Self::validate_content(&request.content)?;

        let message = Message {
            id: self.snowflake.generate(),
            channel_id: channel.id,
            author_id,
            content: request.content,
            reply_to_id: request.reply_to_id,
            created_at: Utc::now(),
            edited_at: None,
        };

        let created = self.message_repo.create(&message).await?;

        self.notify_observers_created(&created).await;
        self.deliver(&channel, &created).await?;

        Ok(MessageDto::from_message(created))
    }

    async fn edit_message(
        &self,
        message_id: i64,
        actor_id: Uuid,
        content: String,
    ) -> Result<MessageDto, MessageError> {
        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(MessageError::NotFound)?;

        if message.author_id != actor_id {
            return Err(MessageError::Forbidden);
        }

        Self::validate_content(&content)?;

        let updated = self
            .message_repo
            .update_content(message_id, &content, Utc::now())
            .await?;

        self.notify_observers_updated(&updated).await;

        Ok(MessageDto::from_message(updated))
    }

    async fn delete_message(&self, message_id: i64, actor_id: Uuid) -> Result<(), MessageError> {
        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or(MessageError::NotFound)?;

        if message.author_id != actor_id {
            let channel = self
                .channel_repo
                .find_by_id(message.channel_id)
                .await?
                .ok_or(MessageError::ChannelNotFound)?;

            let actor = self
                .membership_repo
                .find(channel.server_id, actor_id)
                .await?
                .ok_or(MessageError::Forbidden)?;

            if actor.role != MembershipRole::Owner {
                return Err(MessageError::Forbidden);
            }
        }

        let removed = self
            .message_repo
            .delete(message_id)
            .await?
            .ok_or(MessageError::NotFound)?;

        self.notify_observers_deleted(removed.id, removed.channel_id)
            .await;

        metrics::MESSAGES_DELETED.with_label_values(&["author"]).inc();

        Ok(())
    }

    async fn get_history(
        &self,
        channel_id: Uuid,
        before: Option<i64>,
        limit: i64,
    ) -> Result<Vec<MessageDto>, MessageError> {
        let limit = limit.clamp(1, 100);
        let messages = self
            .message_repo
            .find_by_channel(channel_id, before, limit)
            .await?;

        Ok(messages.into_iter().map(MessageDto::from_message).collect())
    }

    async fn search(
        &self,
        channel_id: Uuid,
        keyword: &str,
        limit: i64,
    ) -> Result<Vec<MessageDto>, MessageError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(MessageError::InvalidContent(
                "Search keyword must not be empty".to_string(),
            ));
        }

        let limit = limit.clamp(1, 100);
        let messages = self.message_repo.search(channel_id, keyword, limit).await?;

        Ok(messages.into_iter().map(MessageDto::from_message).collect())
    }
}
