//! # Relay
//!
//! A typed, zero-copy message dispatch core for actor runtimes.
//!
//! ## Overview
//!
//! Actors receive type-erased [`Message`](core::Message)s and react with
//! statically typed handlers. Relay matches each message against an ordered
//! list of handlers, binds the slots a handler needs, and calls it with
//! references straight into the shared message storage.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ enqueue ┌─────────┐ get_intermediate ┌──────────┐  invoke  ┌─────────┐
//! │  Sender  │────────▶│ Mailbox │─────────────────▶│ Behavior │─────────▶│ Handler │
//! └──────────┘         └─────────┘  (under lock)    └──────────┘ (no lock)└─────────┘
//! ```
//!
//! - **Messages**: immutable, reference-counted tuples of transportable values
//! - **Invokables**: one matcher paired with one handler
//! - **Behaviors**: ordered lists of invokables, first match wins
//! - **Mailboxes**: selective receive with timeouts
//!
//! ## Quick Start
//!
//! ```rust
//! use relay::prelude::*;
//!
//! let mailbox = Mailbox::new();
//! mailbox.enqueue(make_message!("deposit", 100u64)).unwrap();
//!
//! let account = Behavior::new()
//!     .on(|op: &String, amount: &u64| println!("{op} {amount}"))
//!     .others(|| println!("unknown request"));
//!
//! assert!(mailbox.try_receive(&account));
//! ```
//!
//! ## Deriving `Transportable` through this crate
//!
//! The derive names `relay_core` by default. Without a direct dependency on
//! `relay-core`, point it at the re-export:
//!
//! ```rust
//! use relay::prelude::*;
//!
//! #[derive(Clone, Debug, Transportable)]
//! #[transportable(crate = "relay::core")]
//! struct Ping;
//!
//! assert!(Behavior::new().on(|_: &Ping| {}).invoke(&make_message!(Ping)));
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `json-log`: JSON log output

pub use relay_core as core;
pub use relay_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use relay::prelude::*;
/// ```
pub mod prelude {
    // Runtime - configuration, mailboxes
    pub use relay_runtime::{Mailbox, MailboxError, RelayConfig, RelayRuntime};

    // Dispatch core
    pub use relay_core::{
        Behavior, Binding, Intermediate, Invokable, MatchPolicy, Matcher, Message, Pattern,
        Transportable, TupleView, allow_unsafe_message_type, make_message,
    };
}
