//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Message counts by delivery route
//! - Moderation action counts and undo counts
//! - Active gateway session gauge
//! - Invite consumption outcomes

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Messages created, labelled by delivery route
pub static MESSAGES_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_created_total", "Total messages created").namespace("guildhall"),
        &["route"],
    )
    .expect("Failed to create MESSAGES_CREATED metric")
});

/// Messages deleted (moderation or author action)
pub static MESSAGES_DELETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_deleted_total", "Total messages deleted").namespace("guildhall"),
        &["source"], // "author", "moderation"
    )
    .expect("Failed to create MESSAGES_DELETED metric")
});

/// Moderation actions executed, labelled by action name
pub static MODERATION_ACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("moderation_actions_total", "Total moderation actions executed")
            .namespace("guildhall"),
        &["action"],
    )
    .expect("Failed to create MODERATION_ACTIONS metric")
});

/// Moderation actions undone
pub static UNDONE_ACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("moderation_undone_total", "Total moderation actions undone")
            .namespace("guildhall"),
        &["action"],
    )
    .expect("Failed to create UNDONE_ACTIONS metric")
});

/// Invite consumptions, labelled by outcome
pub static INVITE_CONSUMED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("invite_consumed_total", "Total invite consumption attempts")
            .namespace("guildhall"),
        &["outcome"], // "joined", "already_member", "expired", "not_found"
    )
    .expect("Failed to create INVITE_CONSUMED metric")
});

/// Active gateway sessions gauge
pub static ACTIVE_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("active_sessions", "Number of live gateway sessions").namespace("guildhall"),
    )
    .expect("Failed to create ACTIVE_SESSIONS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(MESSAGES_CREATED.clone()))
        .expect("Failed to register MESSAGES_CREATED");
    registry
        .register(Box::new(MESSAGES_DELETED.clone()))
        .expect("Failed to register MESSAGES_DELETED");
    registry
        .register(Box::new(MODERATION_ACTIONS.clone()))
        .expect("Failed to register MODERATION_ACTIONS");
    registry
        .register(Box::new(UNDONE_ACTIONS.clone()))
        .expect("Failed to register UNDONE_ACTIONS");
    registry
        .register(Box::new(INVITE_CONSUMED.clone()))
        .expect("Failed to register INVITE_CONSUMED");
    registry
        .register(Box::new(ACTIVE_SESSIONS.clone()))
        .expect("Failed to register ACTIVE_SESSIONS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}
