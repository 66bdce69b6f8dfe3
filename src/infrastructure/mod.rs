pub mod database;
pub mod metrics;
pub mod presence;
pub mod pubsub;
pub mod repositories;
