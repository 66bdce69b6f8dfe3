mod common;

use chrono::{Duration, Utc};
use common::TestEngine;
use guildhall::application::services::{
    CreateMessageDto, MessageService, ModerationError, ModerationService,
};
use guildhall::domain::entities::{ChannelType, MembershipRepository, MessageRepository};
use guildhall::domain::value_objects::MembershipRole;
use guildhall::infrastructure::pubsub::channel_update_topic;
use uuid::Uuid;

struct Cast {
    owner: Uuid,
    admin: Uuid,
    moderator: Uuid,
    member: Uuid,
    server_id: Uuid,
}

async fn setup(engine: &TestEngine) -> Cast {
    let owner = engine.add_user("alice");
    let admin = engine.add_user("bob");
    let moderator = engine.add_user("carol");
    let member = engine.add_user("dave");
    let server_id = engine.add_server(owner).await;
    engine.add_member(server_id, admin, MembershipRole::Admin).await;
    engine
        .add_member(server_id, moderator, MembershipRole::Moderator)
        .await;
    engine
        .add_member(server_id, member, MembershipRole::Member)
        .await;
    Cast {
        owner,
        admin,
        moderator,
        member,
        server_id,
    }
}

#[tokio::test]
async fn a_moderator_can_kick_a_member() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    engine
        .moderation
        .kick_user(cast.server_id, cast.moderator, cast.member)
        .await
        .unwrap();

    assert!(!engine
        .memberships
        .is_member(cast.server_id, cast.member)
        .await
        .unwrap());
}

#[tokio::test]
async fn equal_or_higher_ranked_targets_are_protected() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    // A moderator cannot touch a higher-ranked admin.
    let up = engine
        .moderation
        .kick_user(cast.server_id, cast.moderator, cast.admin)
        .await;
    assert!(matches!(up, Err(ModerationError::Forbidden)));

    // Nobody outranks the owner.
    let owner_target = engine
        .moderation
        .ban_user(cast.server_id, cast.admin, cast.owner)
        .await;
    assert!(matches!(owner_target, Err(ModerationError::Forbidden)));

    // Self-moderation is equal rank, so it is rejected too.
    let self_target = engine
        .moderation
        .kick_user(cast.server_id, cast.moderator, cast.moderator)
        .await;
    assert!(matches!(self_target, Err(ModerationError::Forbidden)));
}

#[tokio::test]
async fn ban_requires_admin_rank() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    let denied = engine
        .moderation
        .ban_user(cast.server_id, cast.moderator, cast.member)
        .await;
    assert!(matches!(denied, Err(ModerationError::Forbidden)));

    engine
        .moderation
        .ban_user(cast.server_id, cast.admin, cast.member)
        .await
        .unwrap();
}

#[tokio::test]
async fn undoing_a_kick_restores_the_membership_with_its_role() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    // Give the target a nickname so we can check full-state restoration.
    engine
        .memberships
        .set_nickname(cast.server_id, cast.member, Some("Davey".to_string()))
        .await
        .unwrap();

    engine
        .moderation
        .kick_user(cast.server_id, cast.admin, cast.member)
        .await
        .unwrap();
    assert!(!engine
        .memberships
        .is_member(cast.server_id, cast.member)
        .await
        .unwrap());

    let undone = engine
        .moderation
        .undo_last(cast.server_id, cast.admin)
        .await
        .unwrap();
    assert_eq!(undone, Some("kick"));

    let restored = engine
        .memberships
        .find(cast.server_id, cast.member)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.role, MembershipRole::Member);
    assert_eq!(restored.nickname.as_deref(), Some("Davey"));
}

#[tokio::test]
async fn undoing_a_mute_restores_the_prior_window() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    // Pre-existing window from an earlier incident.
    let earlier = Utc::now() + Duration::minutes(3);
    engine
        .memberships
        .set_mute(cast.server_id, cast.member, Some(earlier))
        .await
        .unwrap();

    engine
        .moderation
        .mute_user(cast.server_id, cast.moderator, cast.member, 60)
        .await
        .unwrap();

    let muted = engine
        .memberships
        .find(cast.server_id, cast.member)
        .await
        .unwrap()
        .unwrap();
    assert!(muted.mute_until.unwrap() > earlier);

    engine
        .moderation
        .undo_last(cast.server_id, cast.moderator)
        .await
        .unwrap();

    let restored = engine
        .memberships
        .find(cast.server_id, cast.member)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.mute_until, Some(earlier));
}

#[tokio::test]
async fn a_zero_minute_mute_lifts_the_mute() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    engine
        .moderation
        .mute_user(cast.server_id, cast.moderator, cast.member, 30)
        .await
        .unwrap();
    engine
        .moderation
        .mute_user(cast.server_id, cast.moderator, cast.member, 0)
        .await
        .unwrap();

    let membership = engine
        .memberships
        .find(cast.server_id, cast.member)
        .await
        .unwrap()
        .unwrap();
    assert!(membership.mute_until.is_none());
}

#[tokio::test]
async fn undoing_a_message_deletion_reinserts_the_message() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;
    let channel_id = engine.add_channel(cast.server_id, ChannelType::Text).await;

    let message = engine
        .messages
        .create_message(
            CreateMessageDto {
                channel_id,
                content: "regrettable".to_string(),
                reply_to_id: None,
            },
            cast.member,
        )
        .await
        .unwrap();

    engine
        .moderation
        .delete_message(cast.server_id, cast.moderator, message.id)
        .await
        .unwrap();
    assert!(engine
        .message_repo
        .find_by_id(message.id)
        .await
        .unwrap()
        .is_none());

    let undone = engine
        .moderation
        .undo_last(cast.server_id, cast.moderator)
        .await
        .unwrap();
    assert_eq!(undone, Some("delete_message"));

    let restored = engine
        .message_repo
        .find_by_id(message.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.content, "regrettable");
}

#[tokio::test]
async fn a_moderation_delete_cleans_up_mention_notifications() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;
    let channel_id = engine.add_channel(cast.server_id, ChannelType::Text).await;

    let message = engine
        .messages
        .create_message(
            CreateMessageDto {
                channel_id,
                content: "look at this @carol".to_string(),
                reply_to_id: None,
            },
            cast.member,
        )
        .await
        .unwrap();
    assert_eq!(engine.notifications.all().len(), 1);

    engine
        .moderation
        .delete_message(cast.server_id, cast.admin, message.id)
        .await
        .unwrap();

    // The mention row is gone and the gateway got its MESSAGE_DELETE push.
    assert!(engine.notifications.all().is_empty());
    assert_eq!(engine.pubsub.count_for(&channel_update_topic(channel_id)), 1);
}

#[tokio::test]
async fn clearing_messages_is_evented_per_message_and_undoable() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;
    let channel_id = engine.add_channel(cast.server_id, ChannelType::Text).await;

    for i in 0..4 {
        engine
            .messages
            .create_message(
                CreateMessageDto {
                    channel_id,
                    content: format!("line {}", i),
                    reply_to_id: None,
                },
                cast.member,
            )
            .await
            .unwrap();
    }

    let deleted = engine
        .moderation
        .clear_messages(cast.server_id, cast.moderator, channel_id, 3)
        .await
        .unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(engine.pubsub.count_for(&channel_update_topic(channel_id)), 3);

    let undone = engine
        .moderation
        .undo_last(cast.server_id, cast.moderator)
        .await
        .unwrap();
    assert_eq!(undone, Some("clear"));

    let restored = engine
        .message_repo
        .find_by_channel(channel_id, None, 50)
        .await
        .unwrap();
    assert_eq!(restored.len(), 4);
}

#[tokio::test]
async fn messages_outside_the_server_cannot_be_deleted() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    let other_owner = engine.add_user("eve");
    let other_server = engine.add_server(other_owner).await;
    let other_channel = engine.add_channel(other_server, ChannelType::Text).await;

    let message = engine
        .messages
        .create_message(
            CreateMessageDto {
                channel_id: other_channel,
                content: "elsewhere".to_string(),
                reply_to_id: None,
            },
            other_owner,
        )
        .await
        .unwrap();

    let result = engine
        .moderation
        .delete_message(cast.server_id, cast.moderator, message.id)
        .await;
    assert!(matches!(result, Err(ModerationError::Forbidden)));
}

#[tokio::test]
async fn undo_with_an_empty_history_is_a_noop() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    let undone = engine
        .moderation
        .undo_last(cast.server_id, cast.moderator)
        .await
        .unwrap();
    assert!(undone.is_none());
}

#[tokio::test]
async fn undo_follows_lifo_order() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    engine
        .moderation
        .mute_user(cast.server_id, cast.moderator, cast.member, 10)
        .await
        .unwrap();
    engine
        .moderation
        .kick_user(cast.server_id, cast.admin, cast.member)
        .await
        .unwrap();

    let first = engine
        .moderation
        .undo_last(cast.server_id, cast.admin)
        .await
        .unwrap();
    assert_eq!(first, Some("kick"));

    let second = engine
        .moderation
        .undo_last(cast.server_id, cast.admin)
        .await
        .unwrap();
    assert_eq!(second, Some("mute"));
}

#[tokio::test]
async fn members_cannot_moderate_or_undo() {
    let engine = TestEngine::new();
    let cast = setup(&engine).await;

    let kick = engine
        .moderation
        .kick_user(cast.server_id, cast.member, cast.moderator)
        .await;
    assert!(matches!(kick, Err(ModerationError::Forbidden)));

    let undo = engine.moderation.undo_last(cast.server_id, cast.member).await;
    assert!(matches!(undo, Err(ModerationError::Forbidden)));
}
