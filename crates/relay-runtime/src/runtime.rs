//! Runtime bootstrap.
//!
//! [`RelayRuntime`] loads and validates configuration, installs logging, and
//! hands out behaviors and mailboxes configured from it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use relay_runtime::RelayRuntime;
//!
//! // Loads relay.toml from the current directory and RELAY_* variables
//! let runtime = RelayRuntime::new();
//!
//! // Custom configuration path
//! let runtime = RelayRuntime::builder()
//!     .config_file("config/relay.toml")
//!     .profile("production")
//!     .build()?;
//!
//! let mailbox = runtime.mailbox();
//! let behavior = runtime.behavior().on(|n: &u64| println!("{n}"));
//! mailbox.receive_default(&behavior)?;
//! ```

use std::path::Path;

use relay_core::Behavior;
use tracing::{debug, info};

use crate::config::{ConfigLoader, RelayConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging::{self, LoggingBuilder};
use crate::mailbox::Mailbox;

/// A configured runtime.
#[derive(Debug, Clone)]
pub struct RelayRuntime {
    config: RelayConfig,
}

impl Default for RelayRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayRuntime {
    /// Creates a runtime from the default configuration sources.
    ///
    /// Falls back to built-in defaults if the configuration cannot be loaded
    /// or does not validate.
    pub fn new() -> Self {
        Self::builder().build().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config ({e}), using defaults");
            Self::with_config(RelayConfig::default())
        })
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a validated configuration and initializes logging.
    pub fn from_config(config: RelayConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);
        Ok(Self::with_config(config))
    }

    fn with_config(config: RelayConfig) -> Self {
        info!(
            match_policy = %config.dispatch.match_policy,
            log_level = %config.logging.level,
            "Relay runtime configured"
        );
        Self { config }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Creates an empty behavior using the configured match policy.
    pub fn behavior(&self) -> Behavior {
        self.config.dispatch.new_behavior()
    }

    /// Creates a mailbox with the configured capacity and receive timeout.
    pub fn mailbox(&self) -> Mailbox {
        Mailbox::from_config(&self.config.mailbox)
    }
}

/// How the builder treats logging setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum LoggingInit {
    /// Install a subscriber unless one already exists.
    #[default]
    BestEffort,
    /// Fail the build if a subscriber cannot be installed.
    Required,
    Skip,
}

/// Builder for [`RelayRuntime`].
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    logging: LoggingInit,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            logging: LoggingInit::default(),
        }
    }

    /// Loads this file instead of searching for one.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Adds a directory to search for `relay.toml`.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Ignores `RELAY_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Merges configuration below files and environment.
    pub fn merge(mut self, config: RelayConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.logging = LoggingInit::Skip;
        self
    }

    /// Fails the build if logging cannot be installed.
    pub fn require_logging(mut self) -> Self {
        self.logging = LoggingInit::Required;
        self
    }

    /// Loads, validates, and applies the configuration.
    pub fn build(self) -> RuntimeResult<RelayRuntime> {
        let config = self.loader.load()?;
        validate_config(&config)?;

        match self.logging {
            LoggingInit::BestEffort => logging::init_from_config(&config.logging),
            LoggingInit::Required => LoggingBuilder::from_config(&config.logging)
                .try_init()
                .map_err(|e| RuntimeError::Logging(e.to_string()))?,
            LoggingInit::Skip => debug!("Skipping logging initialization"),
        }

        Ok(RelayRuntime::with_config(config))
    }
}

/// Loads configuration from the default sources and builds a runtime.
pub fn bootstrap() -> RuntimeResult<RelayRuntime> {
    RelayRuntime::builder().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::sync::RelativeTimeout;
    use relay_core::{MatchPolicy, make_message};
    use std::time::Duration;

    #[test]
    fn test_builder_applies_config() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "relay.toml",
                r#"
                [dispatch]
                match_policy = "exact"

                [mailbox]
                capacity = 2
                receive_timeout = { unit = "milliseconds", count = 5 }
                "#,
            )?;

            let runtime = RelayRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .without_logging()
                .build()
                .unwrap();

            let behavior = runtime.behavior().on(|_: &u8| {});
            assert_eq!(behavior.get_policy(), MatchPolicy::Exact);
            assert!(!behavior.invoke(&make_message!(1u8, 2u8)));

            let mailbox = runtime.mailbox();
            assert_eq!(mailbox.capacity(), Some(2));
            assert_eq!(mailbox.default_timeout(), Some(Duration::from_millis(5)));
            Ok(())
        });
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("relay.toml", "[mailbox]\ncapacity = 0\n")?;

            let err = RelayRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .without_logging()
                .build()
                .unwrap_err();
            assert!(matches!(
                err,
                RuntimeError::Config(ConfigError::ValidationError { .. })
            ));
            Ok(())
        });
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = RelayConfig::default();
        config.mailbox.receive_timeout = Some(RelativeTimeout::milliseconds(1));
        assert!(RelayRuntime::from_config(config.clone()).is_ok());

        config.mailbox.capacity = Some(0);
        assert!(RelayRuntime::from_config(config).is_err());
    }
}
