//! Shared error model and configuration for docbot.
//!
//! This crate is the foundation depended on by all other docbot crates.
//! It provides:
//! - [`DocbotError`] — the error type for config and filesystem failures
//! - Configuration ([`AppConfig`], [`ApiConfig`], config loading, credential lookup)

pub mod config;
pub mod error;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, ApiEnvironment, ApiSection, AppConfig, AuthSection, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_access_token, resolve_oauth,
};
pub use error::{DocbotError, Result};
