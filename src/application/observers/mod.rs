//! Message Observers
//!
//! Side effects of the message lifecycle. The engine holds a fixed, ordered
//! list of observers built once at startup; every lifecycle event walks the
//! whole list in registration order. Observer failures are logged and
//! swallowed so one broken side effect cannot block delivery or the others.

pub mod gateway_observer;
pub mod notification_observer;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::Message;
use crate::shared::error::AppError;

pub use gateway_observer::GatewayObserver;
pub use notification_observer::NotificationObserver;

/// Observer of the message lifecycle.
#[async_trait]
pub trait MessageObserver: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    async fn message_created(&self, message: &Message) -> Result<(), AppError>;

    async fn message_updated(&self, message: &Message) -> Result<(), AppError>;

    async fn message_deleted(&self, message_id: i64, channel_id: Uuid) -> Result<(), AppError>;
}
