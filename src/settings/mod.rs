//! Durable key-value settings with typed accessors on top.
//!
//! Values live in a single SQLite table as JSON text. Every call opens its own
//! connection, so concurrent writers on one key resolve as last-writer-wins.

pub mod path;
pub mod store;
pub mod types;

pub use path::SearchOptionPath;
pub use store::SettingsStore;
pub use types::{
    Engine, GeneralSettings, LlmSettings, ModelProvider, ModelSettings, PhoenixSettings,
    SearchOptions, PAGE_SIZE_OPTIONS, UNCATEGORIZED,
};

use thiserror::Error;

pub const SEARCH_OPTIONS_KEY: &str = "search_options";
pub const LLM_SETTINGS_KEY: &str = "llm_settings";
pub const GENERAL_SETTINGS_KEY: &str = "general_settings";
pub const PHOENIX_SETTINGS_KEY: &str = "phoenix_settings";
pub const THEME_KEY: &str = "theme";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Unexpected key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Setting {key} is not an object")]
    NotAnObject { key: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;
