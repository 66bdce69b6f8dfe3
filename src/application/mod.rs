pub mod events;
pub mod observers;
pub mod services;
