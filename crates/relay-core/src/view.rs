//! Projected views over message storage.
//!
//! A [`TupleView`] re-indexes a [`Message`] through a binding: element `n` of
//! the view is element `binding[n]` of the message. Views borrow both the
//! message and the binding, so every access resolves to the value already
//! stored in the message and nothing is copied.
//!
//! [`OwnedView`] is the detached form captured by an
//! [`Intermediate`](crate::Intermediate): it holds its own message handle,
//! which keeps the storage alive until the view is dropped.

use std::fmt;

use crate::error::{ViewError, ViewResult};
use crate::matcher::Binding;
use crate::message::{Element, Message};
use crate::types::{Transportable, TypeTag};

static EMPTY_MESSAGE: Message = Message::empty();

/// A read-only, re-indexed window over a message.
#[derive(Clone, Copy)]
pub struct TupleView<'a> {
    message: &'a Message,
    binding: &'a [usize],
}

impl<'a> TupleView<'a> {
    /// Creates a view, checking the binding against `arity` and the message bounds.
    pub fn new(message: &'a Message, binding: &'a [usize], arity: usize) -> ViewResult<Self> {
        if binding.len() != arity {
            return Err(ViewError::ArityMismatch {
                expected: arity,
                got: binding.len(),
            });
        }
        if let Some(&index) = binding.iter().find(|&&index| index >= message.len()) {
            return Err(ViewError::IndexOutOfBounds {
                index,
                len: message.len(),
            });
        }
        Ok(Self { message, binding })
    }

    /// Creates a view without re-checking a binding validated earlier.
    pub(crate) fn new_unchecked(message: &'a Message, binding: &'a [usize]) -> Self {
        Self { message, binding }
    }

    /// Returns the view of arity zero.
    pub fn unit() -> TupleView<'static> {
        TupleView {
            message: &EMPTY_MESSAGE,
            binding: &[],
        }
    }

    /// Returns the number of projected values.
    pub fn len(&self) -> usize {
        self.binding.len()
    }

    /// Returns true if the view projects nothing.
    pub fn is_empty(&self) -> bool {
        self.binding.is_empty()
    }

    /// Returns the message slot that backs `position`.
    pub fn index(&self, position: usize) -> Option<usize> {
        self.binding.get(position).copied()
    }

    /// Returns the binding this view projects through.
    pub fn binding(&self) -> &'a [usize] {
        self.binding
    }

    /// Returns the projected message.
    pub fn message(&self) -> &'a Message {
        self.message
    }

    /// Returns the type-erased value at `position`.
    pub fn element(&self, position: usize) -> Option<&'a dyn Element> {
        self.message.element(self.index(position)?)
    }

    /// Returns the type tag of the value at `position`.
    pub fn type_tag(&self, position: usize) -> Option<TypeTag> {
        self.element(position).map(|element| element.type_tag())
    }

    /// Returns a reference to the value at `position` if it is a `T`.
    pub fn get<T: Transportable>(&self, position: usize) -> Option<&'a T> {
        self.element(position)?.as_any().downcast_ref()
    }

    /// Returns a reference to the value at `position`, or why it is unavailable.
    pub fn try_get<T: Transportable>(&self, position: usize) -> ViewResult<&'a T> {
        let element = self
            .element(position)
            .ok_or_else(|| ViewError::ArityMismatch {
                expected: position.saturating_add(1),
                got: self.len(),
            })?;
        element
            .as_any()
            .downcast_ref()
            .ok_or_else(|| ViewError::TypeMismatch {
                position,
                expected: std::any::type_name::<T>(),
                found: element.type_tag().name(),
            })
    }

    /// Checks that the projected values have exactly the given types.
    pub fn check_types(&self, tags: &[TypeTag]) -> ViewResult<()> {
        if tags.len() != self.len() {
            return Err(ViewError::ArityMismatch {
                expected: tags.len(),
                got: self.len(),
            });
        }
        for (position, expected) in tags.iter().enumerate() {
            let found = self.type_tag(position).ok_or(ViewError::IndexOutOfBounds {
                index: self.binding[position],
                len: self.message.len(),
            })?;
            if found != *expected {
                return Err(ViewError::TypeMismatch {
                    position,
                    expected: expected.name(),
                    found: found.name(),
                });
            }
        }
        Ok(())
    }

    /// Iterates over the projected values in binding order.
    pub fn iter(&self) -> impl Iterator<Item = &'a dyn Element> + 'a {
        let message = self.message;
        self.binding
            .iter()
            .filter_map(move |&index| message.element(index))
    }
}

impl fmt::Debug for TupleView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleView")
            .field("binding", &self.binding)
            .field("values", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

/// A validated view that owns its message handle and binding.
#[derive(Clone)]
pub struct OwnedView {
    message: Message,
    binding: Binding,
}

impl OwnedView {
    /// Captures `message` and `binding`, checking them against `arity`.
    pub fn new(message: Message, binding: Binding, arity: usize) -> ViewResult<Self> {
        TupleView::new(&message, binding.as_slice(), arity)?;
        Ok(Self { message, binding })
    }

    /// Borrows the captured view.
    pub fn view(&self) -> TupleView<'_> {
        TupleView::new_unchecked(&self.message, self.binding.as_slice())
    }

    /// Returns the captured message handle.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Returns the captured binding.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }
}

impl fmt::Debug for OwnedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}
