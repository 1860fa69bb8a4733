//! # Relay Core
//!
//! The message-dispatch core of the Relay actor runtime.
//!
//! An incoming, type-erased [`Message`] is tested against an ordered set of
//! statically typed handlers. On a match, the handler is called with
//! references straight into the message storage: nothing on the match path
//! copies a payload.
//!
//! ## Building Blocks
//!
//! - **Messages**: immutable, reference-counted, copy-on-write value tuples
//!   ([`Message`], [`make_message!`])
//! - **Transportability**: a compile-time gate on what may enter a message
//!   ([`Transportable`], [`allow_unsafe_message_type!`])
//! - **Matchers**: predicates that compute a [`Binding`] of slot indices
//!   ([`Matcher`], [`Pattern`], [`MatchPolicy`])
//! - **Views**: zero-copy, re-indexed windows over a message ([`TupleView`])
//! - **Invokables**: a fixed matcher/handler pair with immediate or deferred
//!   invocation ([`Invokable`], [`Intermediate`])
//! - **Behaviors**: ordered, first-match-wins lists of invokables ([`Behavior`])
//!
//! ## Example
//!
//! ```rust
//! use relay_core::{Behavior, make_message};
//!
//! let behavior = Behavior::new()
//!     .on(|n: &i32, s: &String| println!("{n}: {s}"))
//!     .on(|| println!("something else"));
//!
//! // Binds slots [0, 2]: the second integer is skipped.
//! assert!(behavior.invoke(&make_message!(1, 2, "three")));
//! ```

extern crate self as relay_core;

pub mod behavior;
pub mod error;
pub mod handler;
pub mod invokable;
pub mod matcher;
pub mod message;
pub mod types;
pub mod view;

pub use behavior::Behavior;
pub use error::{DispatchError, DispatchResult, ViewError, ViewResult};
pub use handler::{ArgList, BoxedTarget, Handler, NullaryTarget};
pub use invokable::{Intermediate, Invokable};
pub use matcher::{AnyMatcher, Binding, FnMatcher, MatchPolicy, Matcher, Pattern, matcher_fn};
pub use message::{Element, IntoMessage, Message, make_message};
pub use relay_macros::Transportable;
pub use types::{IntoElement, Transportable, TypeKind, TypeTag};
pub use view::{OwnedView, TupleView};

/// Items used by generated code. Not part of the public API.
#[doc(hidden)]
pub mod __private {
    pub use serde::Serialize;
    pub use serde::de::DeserializeOwned;
}

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Behavior, Binding, Intermediate, Invokable, MatchPolicy, Matcher, Message, Pattern,
        Transportable, TupleView, allow_unsafe_message_type, make_message,
    };
}
