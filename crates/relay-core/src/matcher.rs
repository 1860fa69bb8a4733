//! Matchers decide whether a handler applies to a message.
//!
//! A [`Matcher`] inspects a [`Message`] and, on success, fills a [`Binding`]:
//! the ordered list of message slots the handler's arguments are read from.
//! Matchers must be pure. Probing the same unmodified message twice yields
//! the same result and the same binding, which lets a dispatcher probe with
//! [`Invokable::get_intermediate`](crate::Invokable::get_intermediate) and
//! [`Invokable::invoke`](crate::Invokable::invoke) interchangeably.
//!
//! # Match Policies
//!
//! [`Pattern`] matches a list of argument types under a [`MatchPolicy`]:
//!
//! - [`MatchPolicy::FirstFit`] (default): the pattern types must appear in the
//!   message as a subsequence. Slots are scanned left to right and each
//!   argument binds the lowest unused index that fits, so `(i32, String)`
//!   against `(1, 2, "x")` binds `[0, 2]`.
//! - [`MatchPolicy::Exact`]: the message types must equal the pattern types
//!   one to one, binding `[0, 1, .., n - 1]`.
//!
//! Under first-fit the empty pattern matches every message. Under exact it
//! only matches the empty message.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::handler::ArgList;
use crate::message::Message;
use crate::types::TypeTag;
use crate::view::TupleView;

/// Ordered message slot indices selected by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Binding(Vec<usize>);

impl Binding {
    /// Creates an empty binding.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates an empty binding with room for `arity` indices.
    pub fn with_capacity(arity: usize) -> Self {
        Self(Vec::with_capacity(arity))
    }

    /// Returns the bound indices.
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    /// Replaces the bound indices.
    pub fn set(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.0.clear();
        self.0.extend(indices);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }
}

impl From<Vec<usize>> for Binding {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl<const N: usize> From<[usize; N]> for Binding {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl<'a> IntoIterator for &'a Binding {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PartialEq<[usize]> for Binding {
    fn eq(&self, other: &[usize]) -> bool {
        self.0 == other
    }
}

impl<const N: usize> PartialEq<[usize; N]> for Binding {
    fn eq(&self, other: &[usize; N]) -> bool {
        self.0 == other
    }
}

/// Decides applicability of one handler to one message.
///
/// `matches` receives `None` for the binding when the handler takes no
/// arguments. On success with a binding slot, the slot is overwritten with
/// exactly [`arity`](Matcher::arity) in-bounds indices. On failure the slot
/// contents are unspecified and must not be read.
pub trait Matcher: Send + Sync {
    /// Number of values this matcher binds.
    fn arity(&self) -> usize;

    /// Tests `message`, writing the binding on success.
    fn matches(&self, message: &Message, binding: Option<&mut Binding>) -> bool;
}

impl<M: Matcher + ?Sized> Matcher for Arc<M> {
    fn arity(&self) -> usize {
        (**self).arity()
    }

    fn matches(&self, message: &Message, binding: Option<&mut Binding>) -> bool {
        (**self).matches(message, binding)
    }
}

impl<M: Matcher + ?Sized> Matcher for Box<M> {
    fn arity(&self) -> usize {
        (**self).arity()
    }

    fn matches(&self, message: &Message, binding: Option<&mut Binding>) -> bool {
        (**self).matches(message, binding)
    }
}

/// How a [`Pattern`] selects message slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Left-to-right subsequence scan, lowest index first.
    #[default]
    FirstFit,
    /// Message types equal the pattern types one to one.
    Exact,
}

impl MatchPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstFit => "first-fit",
            Self::Exact => "exact",
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patterns up to this arity select slots without touching the heap.
const INLINE_SLOTS: usize = 12;

/// A guard predicate evaluated on the candidate view.
pub type GuardFn = Arc<dyn Fn(&TupleView<'_>) -> bool + Send + Sync>;

/// A matcher over a list of argument types.
///
/// Guards run against the binding the policy selects. A failing guard fails
/// the match; the scan does not backtrack to look for another binding.
///
/// A failed match, guard included, performs no heap allocation for patterns
/// of up to twelve types.
#[derive(Clone)]
pub struct Pattern {
    tags: Vec<TypeTag>,
    policy: MatchPolicy,
    guards: Vec<GuardFn>,
}

impl Pattern {
    /// Creates a first-fit pattern over the given types.
    pub fn new(tags: impl Into<Vec<TypeTag>>) -> Self {
        Self {
            tags: tags.into(),
            policy: MatchPolicy::default(),
            guards: Vec::new(),
        }
    }

    /// Creates a pattern from a handler's argument tuple.
    pub fn of<Args: ArgList>() -> Self {
        Self::new(Args::type_tags())
    }

    /// Sets the match policy.
    pub fn policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Adds a guard that must accept the candidate view.
    ///
    /// The guard sees only the binding the policy selected. Under
    /// [`MatchPolicy::FirstFit`] that is the lowest-index fit, and when the
    /// guard rejects it the whole message is rejected: later slots of the
    /// same type are not tried.
    ///
    /// ```rust
    /// use relay_core::{Matcher, Pattern, make_message};
    ///
    /// let answer = Pattern::of::<(i32,)>().guard(|view| view.get::<i32>(0) == Some(&42));
    /// assert!(answer.matches(&make_message!(42i32), None));
    /// // Slot 0 is the first fit; its value fails the guard, slot 1 is never considered.
    /// assert!(!answer.matches(&make_message!(1i32, 42i32), None));
    /// ```
    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&TupleView<'_>) -> bool + Send + Sync + 'static,
    {
        self.guards.push(Arc::new(guard));
        self
    }

    pub fn tags(&self) -> &[TypeTag] {
        &self.tags
    }

    pub fn get_policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Selects candidate slots into a stack buffer and copies them into
    /// `binding` only once the match and every guard succeed.
    fn select(&self, message: &Message, binding: Option<&mut Binding>) -> bool {
        let arity = self.tags.len();
        if arity <= INLINE_SLOTS {
            let mut slots = [0; INLINE_SLOTS];
            self.select_into(message, &mut slots[..arity], binding)
        } else {
            let mut slots = vec![0; arity];
            self.select_into(message, &mut slots, binding)
        }
    }

    fn select_into(
        &self,
        message: &Message,
        slots: &mut [usize],
        binding: Option<&mut Binding>,
    ) -> bool {
        match self.policy {
            MatchPolicy::Exact => {
                if !message.match_types(&self.tags) {
                    return false;
                }
                for (index, slot) in slots.iter_mut().enumerate() {
                    *slot = index;
                }
            }
            MatchPolicy::FirstFit => {
                let mut next = 0;
                for (slot, tag) in slots.iter_mut().zip(&self.tags) {
                    let Some(offset) = (next..message.len())
                        .position(|index| message.type_tag(index).as_ref() == Some(tag))
                    else {
                        return false;
                    };
                    *slot = next + offset;
                    next += offset + 1;
                }
            }
        }

        if !self.guards.is_empty() {
            let view = TupleView::new_unchecked(message, slots);
            if !self.guards.iter().all(|guard| guard(&view)) {
                return false;
            }
        }
        if let Some(binding) = binding {
            binding.set(slots.iter().copied());
        }
        true
    }
}

impl Matcher for Pattern {
    fn arity(&self) -> usize {
        self.tags.len()
    }

    fn matches(&self, message: &Message, binding: Option<&mut Binding>) -> bool {
        self.select(message, binding)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("tags", &self.tags)
            .field("policy", &self.policy)
            .field("guards", &self.guards.len())
            .finish()
    }
}

/// A matcher backed by a closure.
#[derive(Clone)]
pub struct FnMatcher<F> {
    arity: usize,
    f: F,
}

impl<F> FnMatcher<F>
where
    F: Fn(&Message, Option<&mut Binding>) -> bool + Send + Sync,
{
    pub fn new(arity: usize, f: F) -> Self {
        Self { arity, f }
    }
}

impl<F> Matcher for FnMatcher<F>
where
    F: Fn(&Message, Option<&mut Binding>) -> bool + Send + Sync,
{
    fn arity(&self) -> usize {
        self.arity
    }

    fn matches(&self, message: &Message, binding: Option<&mut Binding>) -> bool {
        (self.f)(message, binding)
    }
}

impl<F> fmt::Debug for FnMatcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMatcher")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Creates a matcher of the given arity from a closure.
pub fn matcher_fn<F>(arity: usize, f: F) -> FnMatcher<F>
where
    F: Fn(&Message, Option<&mut Binding>) -> bool + Send + Sync,
{
    FnMatcher::new(arity, f)
}

/// Matches every message without binding anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyMatcher;

impl Matcher for AnyMatcher {
    fn arity(&self) -> usize {
        0
    }

    fn matches(&self, _message: &Message, _binding: Option<&mut Binding>) -> bool {
        true
    }
}
