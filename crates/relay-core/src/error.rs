//! Error types for the dispatch core.
//!
//! A failed match is not an error: matchers report it as `false` and
//! invokables as `None`. The types here describe broken matcher/handler
//! pairings, which are contract violations inside the runtime itself.

use thiserror::Error;

/// Errors raised while projecting a message through a binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// The binding length differs from the handler's arity.
    #[error("binding has {got} indices but the handler takes {expected} arguments")]
    ArityMismatch {
        /// Number of arguments the handler declares.
        expected: usize,
        /// Number of indices in the binding.
        got: usize,
    },

    /// A binding index points past the end of the message.
    #[error("slot index {index} is out of bounds for a message of length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the projected message.
        len: usize,
    },

    /// The bound slot holds a different type than the handler expects.
    #[error("argument {position} expected '{expected}', found '{found}'")]
    TypeMismatch {
        /// Position in the view (handler argument number).
        position: usize,
        /// Type name the handler declares.
        expected: &'static str,
        /// Type name stored in the slot.
        found: &'static str,
    },
}

/// Errors raised when pairing or running matchers and handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The matcher binds a different number of values than the handler takes.
    #[error("matcher binds {matcher} values but the handler takes {handler} arguments")]
    ArityMismatch {
        /// Arity reported by the matcher.
        matcher: usize,
        /// Arity declared by the handler.
        handler: usize,
    },

    /// The binding produced by a matcher could not be projected.
    #[error(transparent)]
    View(#[from] ViewError),
}

/// Result type for view operations.
pub type ViewResult<T> = Result<T, ViewError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
