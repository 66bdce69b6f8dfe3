//! Presence Service
//!
//! Application facade over the in-memory presence tracker. Gateway processes
//! call connect/disconnect as sessions open and close; delivery logic queries
//! it to gate direct-message pushes. Actual liveness transitions are announced
//! on the shared presence topic.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::events::OutboundEvent;
use crate::domain::entities::{Membership, MembershipRepository};
use crate::infrastructure::presence::PresenceTracker;
use crate::infrastructure::pubsub::{presence_topic, PubSub};
use crate::shared::error::AppError;

pub struct PresenceService {
    tracker: Arc<PresenceTracker>,
    membership_repo: Arc<dyn MembershipRepository>,
    pubsub: Arc<dyn PubSub>,
}

impl PresenceService {
    pub fn new(
        tracker: Arc<PresenceTracker>,
        membership_repo: Arc<dyn MembershipRepository>,
        pubsub: Arc<dyn PubSub>,
    ) -> Self {
        Self {
            tracker,
            membership_repo,
            pubsub,
        }
    }

    /// Mark a user online, returning their session ID.
    ///
    /// Announces the change only on an offline-to-online transition; a
    /// reconnect swaps the session silently.
    pub async fn connect(&self, user_id: Uuid) -> Uuid {
        let fresh = !self.tracker.is_online(user_id);
        let session_id = self.tracker.connect(user_id);
        tracing::debug!(%user_id, %session_id, "User connected");

        if fresh {
            self.announce(user_id, true).await;
        }

        session_id
    }

    /// Mark a user offline. Announces the change only if a session existed.
    pub async fn disconnect(&self, user_id: Uuid) {
        if self.tracker.disconnect(user_id) {
            tracing::debug!(%user_id, "User disconnected");
            self.announce(user_id, false).await;
        }
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.tracker.is_online(user_id)
    }

    /// Partition a user set into (online, offline).
    pub fn partition_online(&self, user_ids: &[Uuid]) -> (Vec<Uuid>, Vec<Uuid>) {
        user_ids
            .iter()
            .copied()
            .partition(|id| self.tracker.is_online(*id))
    }

    /// Members of a server that currently hold a live session.
    pub async fn online_members_of(&self, server_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let members = self.membership_repo.find_by_server(server_id).await?;
        Ok(members
            .into_iter()
            .filter(|member| self.tracker.is_online(member.user_id))
            .collect())
    }

    pub fn online_count(&self) -> usize {
        self.tracker.session_count()
    }

    /// Push a PRESENCE_UPDATE; a transport failure is logged, not surfaced,
    /// so a pubsub outage cannot take sessions down with it.
    async fn announce(&self, user_id: Uuid, online: bool) {
        let event = OutboundEvent::PresenceUpdate { user_id, online };
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to encode presence event");
                return;
            }
        };

        if let Err(e) = self.pubsub.publish(&presence_topic(), &payload).await {
            tracing::warn!(%user_id, error = %e, "Failed to publish presence change");
        }
    }
}
