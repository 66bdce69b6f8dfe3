//! Gateway Observer
//!
//! Pushes edit and delete events to the channel's update topic so connected
//! clients can patch their local history. Creation fan-out is not handled
//! here: the delivery route publishes new messages, and doing it twice would
//! double-deliver.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::events::{MessagePayload, OutboundEvent};
use crate::domain::entities::Message;
use crate::infrastructure::pubsub::{channel_update_topic, PubSub};
use crate::shared::error::AppError;

use super::MessageObserver;

pub struct GatewayObserver<P>
where
    P: PubSub,
{
    pubsub: Arc<P>,
}

impl<P> GatewayObserver<P>
where
    P: PubSub,
{
    pub fn new(pubsub: Arc<P>) -> Self {
        Self { pubsub }
    }
}

#[async_trait]
impl<P> MessageObserver for GatewayObserver<P>
where
    P: PubSub + 'static,
{
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn message_created(&self, _message: &Message) -> Result<(), AppError> {
        Ok(())
    }

    async fn message_updated(&self, message: &Message) -> Result<(), AppError> {
        let event = OutboundEvent::MessageUpdate(MessagePayload::from(message));
        let payload = serde_json::to_string(&event)?;
        self.pubsub
            .publish(&channel_update_topic(message.channel_id), &payload)
            .await
    }

    async fn message_deleted(&self, message_id: i64, channel_id: Uuid) -> Result<(), AppError> {
        let event = OutboundEvent::MessageDelete {
            id: message_id,
            channel_id,
        };
        let payload = serde_json::to_string(&event)?;
        self.pubsub
            .publish(&channel_update_topic(channel_id), &payload)
            .await
    }
}
