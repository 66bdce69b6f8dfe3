pub mod settings;

pub use settings::{
    DatabaseSettings, ModerationSettings, RedisSettings, Settings, SnowflakeSettings,
};
