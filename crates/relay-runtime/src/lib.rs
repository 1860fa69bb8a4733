//! Relay Runtime - the layer that decides when to dispatch.
//!
//! This crate provides:
//! - Locking and timed waits (`sync`)
//! - Mailboxes with selective, blocking receive (`Mailbox`)
//! - Configuration loading and validation (`config`)
//! - Logging configuration (`logging`)
//! - Runtime bootstrap (`RelayRuntime`)
//!
//! The dispatch core in `relay-core` never blocks and never locks. A mailbox
//! finds the first queued message a behavior matches, captures the call as an
//! intermediate, and runs it after releasing its lock.
//!
//! ```rust
//! use std::time::Duration;
//! use relay_core::{Behavior, make_message};
//! use relay_runtime::Mailbox;
//!
//! let mailbox = Mailbox::new();
//! mailbox.enqueue(make_message!("ping")).unwrap();
//!
//! let behavior = Behavior::new().on(|s: &String| assert_eq!(s, "ping"));
//! assert!(mailbox.receive_timeout(&behavior, Duration::from_millis(10)).unwrap());
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod mailbox;
pub mod runtime;
pub mod sync;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, RelayConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use mailbox::{Mailbox, MailboxError, MailboxResult};
pub use runtime::{RelayRuntime, RuntimeBuilder, bootstrap};
pub use sync::{RelativeTimeout, TimeUnit};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
