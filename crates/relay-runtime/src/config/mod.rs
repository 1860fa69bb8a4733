//! Configuration module for the Relay runtime.
//!
//! This module provides layered configuration loading (defaults, TOML files,
//! `RELAY_*` environment variables) and validation for dispatch, mailbox and
//! logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, MailboxConfig,
    RelayConfig, SpanEventConfig,
};
pub use validation::validate_config;
