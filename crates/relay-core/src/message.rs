//! Type-erased message container and factory.
//!
//! A [`Message`] is an immutable, ordered sequence of [`Transportable`]
//! values. Cloning a message only bumps a reference count, so a message can
//! be handed to any number of matchers, views and intermediates without
//! copying its payload. The rare mutation path ([`Message::get_mut`]) copies
//! the storage first whenever it is shared.
//!
//! # Building Messages
//!
//! ```rust
//! use relay_core::{Message, make_message};
//!
//! let msg = make_message!(1, "two", vec![3u8]);
//! assert_eq!(msg.len(), 3);
//! assert_eq!(msg.get::<String>(1).map(String::as_str), Some("two"));
//!
//! // Zero arguments produce the canonical empty message.
//! assert!(make_message!().ptr_eq(&Message::empty()));
//!
//! // A single message argument is passed through untouched.
//! let same = make_message!(msg.clone());
//! assert!(same.ptr_eq(&msg));
//! ```
//!
//! Values that are neither serializable nor explicitly allowed are rejected
//! at compile time:
//!
//! ```compile_fail
//! use relay_core::make_message;
//!
//! #[derive(Clone, Debug)]
//! struct Opaque;
//!
//! let _ = make_message!(Opaque);
//! ```

use std::any::Any;
use std::fmt::{self, Debug};
use std::sync::Arc;

use dyn_clone::DynClone;
use static_assertions::assert_impl_all;

use crate::types::{IntoElement, Transportable, TypeTag};

// ============================================================================
// Element
// ============================================================================

/// A single type-erased slot of a [`Message`].
///
/// Implemented for every [`Transportable`] type.
pub trait Element: DynClone + Any + Debug + Send + Sync {
    /// Returns the runtime tag of the stored value.
    fn type_tag(&self) -> TypeTag;

    /// Returns the value as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the value as mutable `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

dyn_clone::clone_trait_object!(Element);

impl<T: Transportable> Element for T {
    #[inline]
    fn type_tag(&self) -> TypeTag {
        TypeTag::of::<T>()
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Message
// ============================================================================

/// Shared storage behind a non-empty message.
#[derive(Clone)]
struct MessageData {
    elements: Vec<Box<dyn Element>>,
}

/// An immutable, shareable, heterogeneous tuple of values.
///
/// The empty message owns no storage; every empty message is the same
/// canonical value.
#[derive(Clone, Default)]
pub struct Message {
    data: Option<Arc<MessageData>>,
}

assert_impl_all!(Message: Send, Sync, Clone);

impl Message {
    /// Returns the canonical empty message.
    pub const fn empty() -> Self {
        Self { data: None }
    }

    pub(crate) fn from_elements(elements: Vec<Box<dyn Element>>) -> Self {
        if elements.is_empty() {
            return Self::empty();
        }
        Self {
            data: Some(Arc::new(MessageData { elements })),
        }
    }

    fn elements(&self) -> &[Box<dyn Element>] {
        match &self.data {
            Some(data) => &data.elements,
            None => &[],
        }
    }

    /// Returns the number of values in this message.
    pub fn len(&self) -> usize {
        self.elements().len()
    }

    /// Returns true if this message holds no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Returns the type-erased value at `index`.
    pub fn element(&self, index: usize) -> Option<&dyn Element> {
        self.elements().get(index).map(|element| element.as_ref())
    }

    /// Returns the type tag of the value at `index`.
    pub fn type_tag(&self, index: usize) -> Option<TypeTag> {
        self.element(index).map(|element| element.type_tag())
    }

    /// Iterates over the type tags of all values, in order.
    pub fn type_tags(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.iter().map(|element| element.type_tag())
    }

    /// Iterates over all values, in order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Element> + '_ {
        self.elements().iter().map(|element| element.as_ref())
    }

    /// Returns a reference to the value at `index` if it is a `T`.
    pub fn get<T: Transportable>(&self, index: usize) -> Option<&T> {
        self.element(index)?.as_any().downcast_ref()
    }

    /// Returns true if the value at `index` is a `T`.
    pub fn match_element<T: Transportable>(&self, index: usize) -> bool {
        self.type_tag(index).is_some_and(|tag| tag.is::<T>())
    }

    /// Returns true if the message types equal `tags` one-to-one.
    pub fn match_types(&self, tags: &[TypeTag]) -> bool {
        self.len() == tags.len() && self.type_tags().zip(tags).all(|(a, b)| a == *b)
    }

    /// Returns a mutable reference to the value at `index` if it is a `T`.
    ///
    /// If the storage is shared with other holders it is copied first, so
    /// the write is never visible through another handle.
    pub fn get_mut<T: Transportable>(&mut self, index: usize) -> Option<&mut T> {
        if !self.match_element::<T>(index) {
            return None;
        }
        let data = Arc::make_mut(self.data.as_mut()?);
        data.elements[index].as_any_mut().downcast_mut()
    }

    /// Returns a new message without the first `n` values.
    pub fn drop_front(&self, n: usize) -> Self {
        Self::from_elements(self.elements().iter().skip(n).cloned().collect())
    }

    /// Returns a new message holding only the first `n` values.
    pub fn take_front(&self, n: usize) -> Self {
        Self::from_elements(self.elements().iter().take(n).cloned().collect())
    }

    /// Returns true if both handles share the same storage.
    ///
    /// Two empty messages always compare equal.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.data, &other.data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Returns the number of handles sharing this message's storage.
    ///
    /// Always `0` for the empty message.
    pub fn strong_count(&self) -> usize {
        self.data.as_ref().map_or(0, Arc::strong_count)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, element) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element:?}")?;
        }
        f.write_str(")")
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("types", &self.type_tags().map(|t| t.name()).collect::<Vec<_>>())
            .field("values", &self.elements())
            .finish()
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Conversion of factory arguments into a [`Message`].
///
/// Implemented for `()` (empty message), for [`Message`] and `(Message,)`
/// (identity), and for tuples of up to 12 [`IntoElement`] values.
pub trait IntoMessage {
    /// Performs the conversion.
    fn into_message(self) -> Message;
}

impl IntoMessage for () {
    fn into_message(self) -> Message {
        Message::empty()
    }
}

impl IntoMessage for Message {
    fn into_message(self) -> Message {
        self
    }
}

impl IntoMessage for (Message,) {
    fn into_message(self) -> Message {
        self.0
    }
}

macro_rules! impl_into_message {
    ($($ty:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($ty: IntoElement),+> IntoMessage for ($($ty,)+) {
            fn into_message(self) -> Message {
                let ($($ty,)+) = self;
                Message::from_elements(vec![
                    $(Box::new($ty.into_element()) as Box<dyn Element>),+
                ])
            }
        }

        impl<$($ty: IntoElement),+> From<($($ty,)+)> for Message {
            fn from(values: ($($ty,)+)) -> Self {
                values.into_message()
            }
        }
    };
}

impl_into_message!(T1);
impl_into_message!(T1, T2);
impl_into_message!(T1, T2, T3);
impl_into_message!(T1, T2, T3, T4);
impl_into_message!(T1, T2, T3, T4, T5);
impl_into_message!(T1, T2, T3, T4, T5, T6);
impl_into_message!(T1, T2, T3, T4, T5, T6, T7);
impl_into_message!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_into_message!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_into_message!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_into_message!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_into_message!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

/// Builds a message from a tuple of values, an existing message, or `()`.
///
/// Prefer the [`make_message!`](crate::make_message!) macro, which accepts
/// the values as a plain argument list.
pub fn make_message<M: IntoMessage>(values: M) -> Message {
    values.into_message()
}

/// Builds a [`Message`] from an argument list.
///
/// - `make_message!()` returns the canonical empty message.
/// - `make_message!(msg)` with an existing [`Message`] returns it unchanged.
/// - `make_message!(a, b, ...)` stores the values in argument order; `&str`
///   arguments are stored as `String`.
#[macro_export]
macro_rules! make_message {
    () => {
        $crate::Message::empty()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::make_message(($($value,)+))
    };
}
