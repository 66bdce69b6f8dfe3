mod common;

use common::TestEngine;
use guildhall::application::events::OutboundEvent;
use guildhall::domain::value_objects::MembershipRole;
use guildhall::infrastructure::pubsub::presence_topic;

#[tokio::test]
async fn online_members_are_the_member_and_online_overlap() {
    let engine = TestEngine::new();
    let owner = engine.add_user("alice");
    let online_member = engine.add_user("bob");
    let offline_member = engine.add_user("carol");
    let online_outsider = engine.add_user("dave");
    let server_id = engine.add_server(owner).await;
    engine
        .add_member(server_id, online_member, MembershipRole::Member)
        .await;
    engine
        .add_member(server_id, offline_member, MembershipRole::Member)
        .await;

    engine.presence.connect(online_member).await;
    engine.presence.connect(online_outsider).await;

    let online = engine.presence.online_members_of(server_id).await.unwrap();
    assert_eq!(online.len(), 1);
    assert_eq!(online[0].user_id, online_member);
}

#[tokio::test]
async fn connect_and_disconnect_announce_presence_changes() {
    let engine = TestEngine::new();
    let user_id = engine.add_user("alice");

    engine.presence.connect(user_id).await;
    engine.presence.disconnect(user_id).await;

    let published = engine.pubsub.messages_for(&presence_topic());
    assert_eq!(published.len(), 2);

    let first: OutboundEvent = serde_json::from_str(&published[0]).unwrap();
    assert!(matches!(
        first,
        OutboundEvent::PresenceUpdate { user_id: id, online: true } if id == user_id
    ));
    let second: OutboundEvent = serde_json::from_str(&published[1]).unwrap();
    assert!(matches!(
        second,
        OutboundEvent::PresenceUpdate { user_id: id, online: false } if id == user_id
    ));
}

#[tokio::test]
async fn redundant_transitions_stay_silent() {
    let engine = TestEngine::new();
    let user_id = engine.add_user("alice");

    // Offline already, nothing to announce.
    engine.presence.disconnect(user_id).await;
    assert_eq!(engine.pubsub.count_for(&presence_topic()), 0);

    engine.presence.connect(user_id).await;
    // A reconnect swaps the session without a new announcement.
    engine.presence.connect(user_id).await;
    assert_eq!(engine.pubsub.count_for(&presence_topic()), 1);
}
