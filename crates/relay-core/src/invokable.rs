//! Invokable units: one matcher paired with one handler.
//!
//! An [`Invokable`] offers two paths over the same matcher:
//!
//! - [`Invokable::invoke`] matches and calls the handler right away.
//! - [`Invokable::get_intermediate`] matches and returns an [`Intermediate`]
//!   that calls the handler later, exactly once.
//!
//! Both report the same outcome for the same message. A dispatcher can probe
//! a list of units with `get_intermediate`, release its locks, and only then
//! run the call.
//!
//! Handlers taking no arguments form their own variant: their matcher is
//! probed without a binding slot and no view is built.

use std::fmt;
use std::sync::Arc;

use static_assertions::assert_impl_all;
use tracing::{debug, error, trace};

use crate::error::{DispatchError, DispatchResult};
use crate::handler::{ArgList, BoxedTarget, Handler, NullaryTarget, into_nullary, into_target};
use crate::matcher::{AnyMatcher, Binding, MatchPolicy, Matcher, Pattern};
use crate::message::Message;
use crate::types::TypeTag;
use crate::view::{OwnedView, TupleView};

#[derive(Clone)]
enum Unit {
    Nullary {
        matcher: Arc<dyn Matcher>,
        target: NullaryTarget,
    },
    NAry {
        matcher: Arc<dyn Matcher>,
        target: BoxedTarget,
        tags: Arc<[TypeTag]>,
    },
}

/// A fixed pairing of a matcher and a handler.
///
/// Invokables are stateless between calls and cheap to clone.
#[derive(Clone)]
pub struct Invokable {
    unit: Unit,
    name: Option<Arc<str>>,
}

assert_impl_all!(Invokable: Send, Sync, Clone);

impl Invokable {
    /// Creates an invokable whose pattern is derived from the handler's
    /// argument types, using the default match policy.
    ///
    /// ```rust
    /// use relay_core::{Invokable, make_message};
    ///
    /// let unit = Invokable::on(|n: &i32, s: &String| println!("{n} {s}"));
    /// assert!(unit.invoke(&make_message!(1, 2, "three")));
    /// assert!(!unit.invoke(&make_message!("three", 1)));
    /// ```
    pub fn on<F, Args>(handler: F) -> Self
    where
        F: Handler<Args>,
        Args: ArgList,
    {
        Self::on_with(MatchPolicy::default(), handler)
    }

    /// Like [`on`](Self::on), with an explicit match policy.
    pub fn on_with<F, Args>(policy: MatchPolicy, handler: F) -> Self
    where
        F: Handler<Args>,
        Args: ArgList,
    {
        Self::build(Arc::new(Pattern::of::<Args>().policy(policy)), handler)
    }

    /// Pairs a custom matcher with a handler.
    ///
    /// Fails if the matcher binds a different number of values than the
    /// handler takes.
    pub fn with_matcher<M, F, Args>(matcher: M, handler: F) -> DispatchResult<Self>
    where
        M: Matcher + 'static,
        F: Handler<Args>,
        Args: ArgList,
    {
        if matcher.arity() != Args::ARITY {
            return Err(DispatchError::ArityMismatch {
                matcher: matcher.arity(),
                handler: Args::ARITY,
            });
        }
        Ok(Self::build(Arc::new(matcher), handler))
    }

    /// Creates a catch-all unit that matches every message.
    pub fn others<F>(handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build::<F, ()>(Arc::new(AnyMatcher), handler)
    }

    fn build<F, Args>(matcher: Arc<dyn Matcher>, handler: F) -> Self
    where
        F: Handler<Args>,
        Args: ArgList,
    {
        let unit = if Args::ARITY == 0 {
            Unit::Nullary {
                matcher,
                target: into_nullary(handler),
            }
        } else {
            Unit::NAry {
                matcher,
                target: into_target(handler),
                tags: Args::type_tags().into(),
            }
        };
        Self { unit, name: None }
    }

    /// Sets a name used in log output.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the name, if set.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the number of arguments the handler takes.
    pub fn arity(&self) -> usize {
        match &self.unit {
            Unit::Nullary { .. } => 0,
            Unit::NAry { tags, .. } => tags.len(),
        }
    }

    /// Returns the matcher.
    pub fn matcher(&self) -> &Arc<dyn Matcher> {
        match &self.unit {
            Unit::Nullary { matcher, .. } | Unit::NAry { matcher, .. } => matcher,
        }
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    /// Matches `message` and, on success, calls the handler.
    ///
    /// Returns `Ok(false)` without calling the handler if the message does
    /// not match. An error means the matcher produced a binding the handler
    /// cannot consume.
    pub fn try_invoke(&self, message: &Message) -> DispatchResult<bool> {
        match &self.unit {
            Unit::Nullary { matcher, target } => {
                if !matcher.matches(message, None) {
                    trace!(invokable = self.label(), "no match");
                    return Ok(false);
                }
                trace!(invokable = self.label(), arity = 0, "matched");
                target();
                Ok(true)
            }
            Unit::NAry {
                matcher,
                target,
                tags,
            } => {
                let mut binding = Binding::new();
                if !matcher.matches(message, Some(&mut binding)) {
                    trace!(invokable = self.label(), "no match");
                    return Ok(false);
                }
                trace!(invokable = self.label(), binding = ?binding.as_slice(), "matched");
                let view = TupleView::new(message, binding.as_slice(), tags.len())?;
                view.check_types(tags)?;
                target(&view)?;
                Ok(true)
            }
        }
    }

    /// Matches `message` and, on success, calls the handler.
    ///
    /// # Panics
    ///
    /// Panics if the matcher's binding does not fit the handler. That is a
    /// broken matcher/handler pairing, not a property of the message.
    pub fn invoke(&self, message: &Message) -> bool {
        match self.try_invoke(message) {
            Ok(matched) => matched,
            Err(err) => self.misuse(err),
        }
    }

    /// Matches `message` and, on success, captures a deferred call.
    ///
    /// Returns `Ok(None)` without allocating if the message does not match.
    pub fn try_get_intermediate(&self, message: &Message) -> DispatchResult<Option<Intermediate>> {
        match &self.unit {
            Unit::Nullary { matcher, target } => {
                if !matcher.matches(message, None) {
                    return Ok(None);
                }
                Ok(Some(Intermediate {
                    call: Call::Nullary(Arc::clone(target)),
                }))
            }
            Unit::NAry {
                matcher,
                target,
                tags,
            } => {
                let mut binding = Binding::new();
                if !matcher.matches(message, Some(&mut binding)) {
                    return Ok(None);
                }
                let view = OwnedView::new(message.clone(), binding, tags.len())?;
                view.view().check_types(tags)?;
                Ok(Some(Intermediate {
                    call: Call::NAry {
                        view,
                        target: Arc::clone(target),
                    },
                }))
            }
        }
    }

    /// Matches `message` and, on success, captures a deferred call.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`invoke`](Self::invoke).
    pub fn get_intermediate(&self, message: &Message) -> Option<Intermediate> {
        match self.try_get_intermediate(message) {
            Ok(intermediate) => intermediate,
            Err(err) => self.misuse(err),
        }
    }

    fn misuse(&self, err: DispatchError) -> ! {
        error!(invokable = self.label(), error = %err, "matcher/handler contract violated");
        panic!("invokable `{}`: {err}", self.label());
    }
}

impl fmt::Debug for Invokable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Invokable");
        s.field("name", &self.name).field("arity", &self.arity());
        if let Unit::NAry { tags, .. } = &self.unit {
            s.field("tags", tags);
        }
        s.finish()
    }
}

enum Call {
    Nullary(NullaryTarget),
    NAry { view: OwnedView, target: BoxedTarget },
}

/// A deferred, single-use handler call.
///
/// Holds a handle on the matched message, which stays alive until the
/// intermediate is invoked or dropped. [`invoke`](Self::invoke) consumes it.
#[must_use = "an intermediate does nothing unless invoked"]
pub struct Intermediate {
    call: Call,
}

assert_impl_all!(Intermediate: Send);

impl Intermediate {
    /// Calls the handler with the captured values.
    pub fn invoke(self) {
        match self.call {
            Call::Nullary(target) => target(),
            Call::NAry { view, target } => {
                if let Err(err) = target(&view.view()) {
                    error!(error = %err, "deferred call rejected its captured view");
                    panic!("intermediate: {err}");
                }
            }
        }
        debug!("intermediate invoked");
    }

    /// Returns the number of arguments the handler takes.
    pub fn arity(&self) -> usize {
        match &self.call {
            Call::Nullary(_) => 0,
            Call::NAry { view, .. } => view.binding().len(),
        }
    }

    /// Returns the captured binding. Nullary calls have none.
    pub fn binding(&self) -> Option<&Binding> {
        match &self.call {
            Call::Nullary(_) => None,
            Call::NAry { view, .. } => Some(view.binding()),
        }
    }

    /// Returns the captured message handle. Nullary calls hold none.
    pub fn message(&self) -> Option<&Message> {
        match &self.call {
            Call::Nullary(_) => None,
            Call::NAry { view, .. } => Some(view.message()),
        }
    }

    /// Returns the captured view, if any.
    pub fn view(&self) -> Option<TupleView<'_>> {
        match &self.call {
            Call::Nullary(_) => None,
            Call::NAry { view, .. } => Some(view.view()),
        }
    }
}

impl fmt::Debug for Intermediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intermediate")
            .field("arity", &self.arity())
            .field("binding", &self.binding())
            .finish()
    }
}
