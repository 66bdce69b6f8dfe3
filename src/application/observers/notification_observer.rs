//! Notification Observer
//!
//! Scans new messages for @username mentions and writes a notification row
//! per mentioned user. Deleting a message removes its notifications.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{Notification, NotificationRepository, UserRepository};
use crate::domain::entities::Message;
use crate::shared::error::AppError;

use super::MessageObserver;

pub struct NotificationObserver<N, U>
where
    N: NotificationRepository,
    U: UserRepository,
{
    notification_repo: Arc<N>,
    user_repo: Arc<U>,
}

impl<N, U> NotificationObserver<N, U>
where
    N: NotificationRepository,
    U: UserRepository,
{
    pub fn new(notification_repo: Arc<N>, user_repo: Arc<U>) -> Self {
        Self {
            notification_repo,
            user_repo,
        }
    }

    /// Extract candidate usernames from @mentions in the content.
    ///
    /// A mention is `@` followed by a run of word characters. Duplicates are
    /// collapsed so one user gets at most one notification per message.
    fn extract_mentions(content: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();

        for (i, c) in content.char_indices() {
            if c != '@' {
                continue;
            }
            let rest = &content[i + 1..];
            let name: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }

        names
    }

    async fn notify_mentions(&self, message: &Message) -> Result<(), AppError> {
        for name in Self::extract_mentions(&message.content) {
            let Some(user) = self.user_repo.find_by_username(&name).await? else {
                continue;
            };
            // Self-mentions produce no notification.
            if user.id == message.author_id {
                continue;
            }

            let notification =
                Notification::mention(user.id, message.channel_id, message.id, message.author_id);
            self.notification_repo.create(&notification).await?;

            tracing::debug!(
                message_id = message.id,
                recipient = %user.id,
                "Created mention notification"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl<N, U> MessageObserver for NotificationObserver<N, U>
where
    N: NotificationRepository + 'static,
    U: UserRepository + 'static,
{
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn message_created(&self, message: &Message) -> Result<(), AppError> {
        self.notify_mentions(message).await
    }

    async fn message_updated(&self, message: &Message) -> Result<(), AppError> {
        // An edit can introduce new mentions.
        self.notify_mentions(message).await
    }

    async fn message_deleted(&self, message_id: i64, _channel_id: Uuid) -> Result<(), AppError> {
        self.notification_repo.delete_by_message(message_id).await?;
        Ok(())
    }
}
