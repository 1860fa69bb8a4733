//! Runtime error types.

use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};
pub use crate::mailbox::{MailboxError, MailboxResult};

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Mailbox error.
    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    /// A global logging subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
