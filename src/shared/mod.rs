//! Cross-layer utilities: errors, ID generation, validation glue.

pub mod error;
pub mod snowflake;
pub mod validation;
