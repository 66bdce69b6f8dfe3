//! Delivery route selection.
//!
//! Maps a channel's type to the real-time fan-out destination for newly
//! created messages. The mapping is an exhaustive match over the closed
//! channel-type set, so there is no "unknown strategy" failure mode.

use crate::domain::entities::ChannelType;

/// Where a created message is pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryRoute {
    /// Broadcast to the channel topic (text and voice-chat channels).
    ChannelTopic,
    /// Broadcast to the server-wide announcement topic.
    AnnouncementTopic,
    /// Deliver to each online participant's private queue. Offline
    /// participants receive nothing; there is no store-and-forward.
    DirectQueues,
}

impl DeliveryRoute {
    /// Select the route for a channel. Exactly one route applies per message.
    pub fn for_channel(kind: ChannelType) -> Self {
        match kind {
            ChannelType::Dm => DeliveryRoute::DirectQueues,
            ChannelType::Announcement => DeliveryRoute::AnnouncementTopic,
            ChannelType::Text | ChannelType::Voice => DeliveryRoute::ChannelTopic,
        }
    }

    /// Label used for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryRoute::ChannelTopic => "channel",
            DeliveryRoute::AnnouncementTopic => "announcement",
            DeliveryRoute::DirectQueues => "direct",
        }
    }
}
