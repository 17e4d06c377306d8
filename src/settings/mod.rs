//! Configuration settings consumed by the pricing engine.
//!
//! Settings are grouped key/value entries (`pricing.umzug.base_price`)
//! stored as text with a declared type. The engine reads them through
//! [`ConfigurationStore`], which caches lookups and never fails on unknown
//! keys.

pub mod keys;
pub mod models;
pub mod queries;
pub mod store;

pub use models::{FromSettingValue, Setting, SettingType, SettingValue};
pub use queries::PgSettingsRepository;
pub use store::{ConfigurationStore, InMemorySettingsRepository, SettingsRepository};

/// Settings access errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Settings backend unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown setting type: {0}")]
    UnknownType(String),

    #[error("Value '{value}' is not a valid {ty}")]
    InvalidValue { value: String, ty: &'static str },
}
