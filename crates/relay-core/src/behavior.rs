//! Ordered, first-match-wins dispatch.
//!
//! A [`Behavior`] is the list of [`Invokable`]s an actor currently responds
//! with. Dispatching a message probes the units in the order they were added
//! and stops at the first match; units after it are never probed.
//!
//! ```rust
//! use relay_core::{Behavior, make_message};
//!
//! let behavior = Behavior::new()
//!     .name("counter")
//!     .on(|n: &u64| println!("add {n}"))
//!     .on(|cmd: &String| println!("command {cmd}"))
//!     .others(|| println!("ignored"));
//!
//! assert!(behavior.invoke(&make_message!(3u64)));
//!
//! // Probe now, call later.
//! let deferred = behavior.get_intermediate(&make_message!("reset")).unwrap();
//! deferred.invoke();
//! ```

use std::sync::Arc;

use tracing::{Level, debug, span, trace};

use crate::error::DispatchResult;
use crate::handler::{ArgList, Handler};
use crate::invokable::{Intermediate, Invokable};
use crate::matcher::{MatchPolicy, Matcher};
use crate::message::Message;

#[derive(Clone, Default)]
struct BehaviorInner {
    units: Vec<Invokable>,
    policy: MatchPolicy,
    name: Option<String>,
}

/// An ordered list of invokable units.
///
/// Cloning is cheap; builder calls copy the list only when it is shared.
#[derive(Clone, Default)]
pub struct Behavior {
    inner: Arc<BehaviorInner>,
}

impl Behavior {
    /// Creates an empty behavior using the default match policy.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner_mut(&mut self) -> &mut BehaviorInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Sets a name used in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner_mut().name = Some(name.into());
        self
    }

    /// Sets the policy used by later [`on`](Self::on) calls.
    pub fn policy(mut self, policy: MatchPolicy) -> Self {
        self.inner_mut().policy = policy;
        self
    }

    /// Appends a handler whose pattern is derived from its argument types.
    pub fn on<F, Args>(self, handler: F) -> Self
    where
        F: Handler<Args>,
        Args: ArgList,
    {
        let policy = self.inner.policy;
        self.with(Invokable::on_with(policy, handler))
    }

    /// Appends a handler matched under an explicit policy.
    pub fn on_with<F, Args>(self, policy: MatchPolicy, handler: F) -> Self
    where
        F: Handler<Args>,
        Args: ArgList,
    {
        self.with(Invokable::on_with(policy, handler))
    }

    /// Appends a handler paired with a custom matcher.
    pub fn on_matcher<M, F, Args>(self, matcher: M, handler: F) -> DispatchResult<Self>
    where
        M: Matcher + 'static,
        F: Handler<Args>,
        Args: ArgList,
    {
        Ok(self.with(Invokable::with_matcher(matcher, handler)?))
    }

    /// Appends a catch-all handler.
    pub fn others<F>(self, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.with(Invokable::others(handler))
    }

    /// Appends a unit (builder pattern).
    pub fn with(mut self, unit: Invokable) -> Self {
        self.add(unit);
        self
    }

    /// Appends a unit.
    pub fn add(&mut self, unit: Invokable) {
        self.inner_mut().units.push(unit);
    }

    /// Appends the units of `other`, which are tried after the units of `self`.
    pub fn or_else(mut self, other: Behavior) -> Self {
        let units = match Arc::try_unwrap(other.inner) {
            Ok(inner) => inner.units,
            Err(shared) => shared.units.clone(),
        };
        self.inner_mut().units.extend(units);
        self
    }

    /// Removes every unit.
    pub fn clear(&mut self) {
        self.inner_mut().units.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.units.is_empty()
    }

    pub fn get_name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn get_policy(&self) -> MatchPolicy {
        self.inner.policy
    }

    /// Iterates over the units in probe order.
    pub fn units(&self) -> impl Iterator<Item = &Invokable> {
        self.inner.units.iter()
    }

    fn label(&self) -> &str {
        self.inner.name.as_deref().unwrap_or("unnamed")
    }

    /// Calls the first unit that matches `message`.
    ///
    /// Returns `false` if no unit matched.
    ///
    /// # Panics
    ///
    /// Panics if the matching unit's matcher and handler disagree, see
    /// [`Invokable::invoke`].
    pub fn invoke(&self, message: &Message) -> bool {
        let span = span!(Level::DEBUG, "dispatch", behavior = self.label(), len = message.len());
        let _enter = span.enter();

        for (index, unit) in self.inner.units.iter().enumerate() {
            trace!(index, invokable = unit.get_name().unwrap_or("unnamed"), "probing");
            if unit.invoke(message) {
                debug!(index, "message handled");
                return true;
            }
        }
        debug!(units = self.len(), "no unit matched");
        false
    }

    /// Finds the first unit that matches `message` and defers its call.
    pub fn get_intermediate(&self, message: &Message) -> Option<Intermediate> {
        let span = span!(Level::DEBUG, "probe", behavior = self.label(), len = message.len());
        let _enter = span.enter();

        let found = self
            .inner
            .units
            .iter()
            .enumerate()
            .find_map(|(index, unit)| {
                trace!(index, invokable = unit.get_name().unwrap_or("unnamed"), "probing");
                unit.get_intermediate(message).map(|intermediate| (index, intermediate))
            });

        match found {
            Some((index, intermediate)) => {
                debug!(index, "deferred call captured");
                Some(intermediate)
            }
            None => {
                trace!("no unit matched");
                None
            }
        }
    }
}

impl std::fmt::Debug for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Behavior")
            .field("name", &self.inner.name)
            .field("policy", &self.inner.policy)
            .field("units", &self.inner.units.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_message;
    use crate::matcher::{Binding, Pattern};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how often it is probed and delegates to a pattern.
    struct CountingMatcher {
        probes: Arc<AtomicUsize>,
        pattern: Pattern,
    }

    impl Matcher for CountingMatcher {
        fn arity(&self) -> usize {
            self.pattern.arity()
        }

        fn matches(&self, message: &Message, binding: Option<&mut Binding>) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.pattern.matches(message, binding)
        }
    }

    struct Probe {
        probes: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    fn probed<Args: ArgList>(behavior: Behavior) -> (Behavior, Probe) {
        let probe = Probe {
            probes: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let matcher = CountingMatcher {
            probes: Arc::clone(&probe.probes),
            pattern: Pattern::of::<Args>(),
        };
        let calls = Arc::clone(&probe.calls);
        let unit = Invokable::with_matcher(matcher, move |_: &String| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        (behavior.with(unit.unwrap()), probe)
    }

    #[test]
    fn test_empty_behavior() {
        let behavior = Behavior::new();
        assert!(behavior.is_empty());
        assert!(!behavior.invoke(&make_message!(1i32)));
        assert!(behavior.get_intermediate(&make_message!(1i32)).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&log), Arc::clone(&log));
        let behavior = Behavior::new()
            .on(move |_: &i32| a.lock().unwrap().push("int"))
            .on(move |_: &i32, _: &String| b.lock().unwrap().push("int-string"));

        assert!(behavior.invoke(&make_message!(1i32, "x")));
        assert_eq!(*log.lock().unwrap(), vec!["int"]);
    }

    #[test]
    fn test_only_middle_candidate_matches() {
        let a = Behavior::new();
        let (a, probe_a) = probed::<(u8,)>(a);
        let (b, probe_b) = probed::<(String,)>(a);
        let (behavior, probe_c) = probed::<(String,)>(b);
        assert_eq!(behavior.len(), 3);

        // A expects a u8 and is probed but never called.
        assert!(behavior.invoke(&make_message!("only b")));

        assert_eq!(probe_a.probes.load(Ordering::SeqCst), 1);
        assert_eq!(probe_b.probes.load(Ordering::SeqCst), 1);
        assert_eq!(probe_b.calls.load(Ordering::SeqCst), 1);
        assert_eq!(probe_c.probes.load(Ordering::SeqCst), 0);
        assert_eq!(probe_c.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_intermediate_stops_at_first_match() {
        let (a, probe_a) = probed::<(u8,)>(Behavior::new());
        let (b, probe_b) = probed::<(String,)>(a);
        let (behavior, probe_c) = probed::<(String,)>(b);

        let intermediate = behavior.get_intermediate(&make_message!("deferred")).unwrap();
        assert_eq!(probe_a.probes.load(Ordering::SeqCst), 1);
        assert_eq!(probe_b.probes.load(Ordering::SeqCst), 1);
        assert_eq!(probe_c.probes.load(Ordering::SeqCst), 0);
        assert_eq!(probe_b.calls.load(Ordering::SeqCst), 0);

        intermediate.invoke();
        assert_eq!(probe_b.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_others_catches_remaining() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let behavior = Behavior::new()
            .on_with(MatchPolicy::Exact, |_: &i32| {})
            .others(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        assert!(behavior.invoke(&make_message!(1i32)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(behavior.invoke(&make_message!(1i32, 2i32)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_applies_to_later_units() {
        let behavior = Behavior::new()
            .policy(MatchPolicy::Exact)
            .on(|_: &i32| {});
        assert_eq!(behavior.get_policy(), MatchPolicy::Exact);
        assert!(!behavior.invoke(&make_message!(1i32, "tail")));
        assert!(behavior.invoke(&make_message!(1i32)));
    }

    #[test]
    fn test_or_else_appends() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&hits), Arc::clone(&hits));
        let primary = Behavior::new().on(move |_: &i32| a.lock().unwrap().push("primary"));
        let fallback = Behavior::new().on(move |_: &String| b.lock().unwrap().push("fallback"));
        let shared = fallback.clone();

        let combined = primary.or_else(fallback);
        assert_eq!(combined.len(), 2);
        assert_eq!(shared.len(), 1);

        assert!(combined.invoke(&make_message!("s")));
        assert!(combined.invoke(&make_message!(1i32)));
        assert_eq!(*hits.lock().unwrap(), vec!["fallback", "primary"]);
    }

    #[test]
    fn test_clone_on_write_builders() {
        let base = Behavior::new().on(|_: &i32| {});
        let extended = base.clone().on(|_: &String| {});
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);

        let mut cleared = extended.clone();
        cleared.clear();
        assert!(cleared.is_empty());
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn test_on_matcher_rejects_arity_mismatch() {
        let matcher = Pattern::of::<(i32, i32)>();
        assert!(Behavior::new().on_matcher(matcher, |_: &i32| {}).is_err());
    }

    #[test]
    fn test_name_and_debug() {
        let behavior = Behavior::new().name("greeter").on(|_: &String| {});
        assert_eq!(behavior.get_name(), Some("greeter"));
        assert!(format!("{behavior:?}").contains("greeter"));
        assert_eq!(behavior.units().count(), 1);
    }
}
