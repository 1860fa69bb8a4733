//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, MailboxConfig, RelayConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RelayConfig) -> ConfigResult<()> {
    validate_mailbox_config(&config.mailbox)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates mailbox settings.
fn validate_mailbox_config(mailbox: &MailboxConfig) -> ConfigResult<()> {
    if mailbox.capacity == Some(0) {
        return Err(ConfigError::validation(
            "Mailbox capacity must be greater than 0",
        ));
    }

    if let Some(timeout) = mailbox.receive_timeout {
        if timeout.deadline_from(crate::sync::now()).is_none() {
            return Err(ConfigError::validation(format!(
                "Receive timeout {timeout} is too large"
            )));
        }
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        match &logging.file_path {
            None => return Err(ConfigError::missing_field("logging.file_path")),
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::validation(format!(
                    "Log file path has no file name: {}",
                    path.display()
                )));
            }
            Some(_) => {}
        }
    }

    for target in logging.filters.keys() {
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: {target:?}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use crate::sync::RelativeTimeout;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = RelayConfig::default();
        config.mailbox.capacity = Some(0);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_overflowing_timeout_rejected() {
        let mut config = RelayConfig::default();
        config.mailbox.receive_timeout = Some(RelativeTimeout::seconds(u64::MAX));
        assert!(validate_config(&config).is_err());

        config.mailbox.receive_timeout = Some(RelativeTimeout::milliseconds(0));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = RelayConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "logging.file_path"
        ));

        config.logging.file_path = Some(PathBuf::from("/"));
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("logs/relay.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_filter_targets() {
        let mut config = RelayConfig::default();
        config
            .logging
            .filters
            .insert("relay core".to_string(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
