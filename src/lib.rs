//! Guildhall
//!
//! Core engine for a community chat backend: servers and memberships,
//! invites, presence, message broadcast with pluggable delivery routes,
//! moderation with undo, and a slash command router. Transport-facing
//! layers (HTTP, WebSocket gateways) live in separate crates and drive
//! this one through its services.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod startup;
pub mod telemetry;

pub use startup::ChatEngine;
