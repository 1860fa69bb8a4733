//! Runtime type tags and the transportability gate.
//!
//! Every slot of a [`Message`](crate::Message) carries a [`TypeTag`]: the
//! exact `TypeId` of the stored value plus the [`TypeKind`] family it belongs
//! to. Matchers compare tags; nothing else in the dispatch path inspects
//! types at runtime.
//!
//! Only [`Transportable`] types may enter a message. The trait is implemented
//! here for primitives, strings and the standard aggregates, and user types
//! opt in either through `#[derive(Transportable)]` (serializable types,
//! field-less structs and C-like enums) or through
//! [`allow_unsafe_message_type!`](crate::allow_unsafe_message_type) for
//! payloads that will never leave the process. Anything else is rejected by
//! the compiler.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::time::Duration;

// ============================================================================
// Type Classification
// ============================================================================

/// The family a transportable type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The unit type `()`.
    Unit,
    /// `bool`.
    Bool,
    /// Signed and unsigned integers.
    Integer,
    /// `f32` and `f64`.
    Float,
    /// `char`.
    Char,
    /// `String`.
    String,
    /// A type without fields.
    Empty,
    /// An enum whose variants carry no data.
    Enum,
    /// Sequences and sets.
    List,
    /// Key/value maps.
    Map,
    /// Tuples.
    Tuple,
    /// `Option<T>`.
    Option,
    /// A type implementing the serde read/write contract.
    Inspectable,
    /// A type explicitly allowed without being serializable.
    Unsafe,
}

impl TypeKind {
    /// Returns the kind name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Char => "char",
            Self::String => "string",
            Self::Empty => "empty",
            Self::Enum => "enum",
            Self::List => "list",
            Self::Map => "map",
            Self::Tuple => "tuple",
            Self::Option => "option",
            Self::Inspectable => "inspectable",
            Self::Unsafe => "unsafe",
        }
    }

    /// Returns true for scalar kinds.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Unit | Self::Bool | Self::Integer | Self::Float | Self::Char
        )
    }

    /// Returns true for container kinds.
    pub fn is_aggregate(self) -> bool {
        matches!(self, Self::List | Self::Map | Self::Tuple | Self::Option)
    }

    /// Returns true unless the type was allowed without a serialization contract.
    pub fn is_serializable(self) -> bool {
        self != Self::Unsafe
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Type Tag
// ============================================================================

/// Runtime type identifier attached to every message slot.
///
/// Two tags are equal when they describe the same concrete type; the name
/// and kind are carried along for diagnostics and filtering.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
}

impl TypeTag {
    /// Returns the tag of `T`.
    pub fn of<T: Transportable>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: T::KIND,
        }
    }

    /// Returns the `TypeId` of the tagged type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the kind of the tagged type.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Returns true if this tag describes `T`.
    pub fn is<T: Transportable>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTag")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// Transportable
// ============================================================================

/// Marker for types that may be stored in a [`Message`](crate::Message).
///
/// `Clone` is required so shared storage can be copied on write; `Send` and
/// `Sync` so messages can be read from any thread without locking.
///
/// # Opting In
///
/// ```rust
/// use relay_core::{Transportable, TypeKind, TypeTag};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Serialize, Deserialize, Transportable)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// #[derive(Clone, Debug, Transportable)]
/// enum Color {
///     Red,
///     Green,
/// }
///
/// assert_eq!(TypeTag::of::<Point>().kind(), TypeKind::Inspectable);
/// assert_eq!(TypeTag::of::<Color>().kind(), TypeKind::Enum);
/// ```
///
/// A derive on a type with fields requires serde support, so a type that
/// only holds an opaque value does not compile:
///
/// ```compile_fail
/// use relay_core::Transportable;
///
/// #[derive(Clone, Debug)]
/// struct Opaque;
///
/// #[derive(Clone, Debug, Transportable)]
/// struct Holder {
///     o: Opaque,
/// }
/// ```
///
/// The same holds for enums whose variants carry data:
///
/// ```compile_fail
/// use relay_core::Transportable;
///
/// #[derive(Clone, Debug, Transportable)]
/// enum Reply {
///     Value(i32),
///     Missing,
/// }
/// ```
pub trait Transportable: Any + Clone + Debug + Send + Sync {
    /// The family this type belongs to.
    const KIND: TypeKind;
}

/// Allows types without a serialization contract inside messages.
///
/// Such messages work within one process but can never be sent over a
/// network transport. The types still need `Clone + Debug + Send + Sync`.
///
/// ```rust
/// use relay_core::{TypeKind, allow_unsafe_message_type, make_message};
///
/// #[derive(Clone, Debug)]
/// struct Opaque(std::sync::Arc<u8>);
///
/// allow_unsafe_message_type!(Opaque);
///
/// let msg = make_message!(Opaque(Default::default()));
/// assert_eq!(msg.type_tag(0).unwrap().kind(), TypeKind::Unsafe);
/// ```
#[macro_export]
macro_rules! allow_unsafe_message_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Transportable for $ty {
                const KIND: $crate::TypeKind = $crate::TypeKind::Unsafe;
            }
        )+
    };
}

macro_rules! impl_transportable {
    ($kind:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl Transportable for $ty {
                const KIND: TypeKind = TypeKind::$kind;
            }
        )+
    };
}

impl_transportable!(Unit => ());
impl_transportable!(Bool => bool);
impl_transportable!(Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_transportable!(Float => f32, f64);
impl_transportable!(Char => char);
impl_transportable!(String => String);
impl_transportable!(Inspectable => Duration);

impl<T: Transportable> Transportable for Vec<T> {
    const KIND: TypeKind = TypeKind::List;
}

impl<T: Transportable> Transportable for VecDeque<T> {
    const KIND: TypeKind = TypeKind::List;
}

impl<T: Transportable, const N: usize> Transportable for [T; N] {
    const KIND: TypeKind = TypeKind::List;
}

impl<T: Transportable + Ord> Transportable for BTreeSet<T> {
    const KIND: TypeKind = TypeKind::List;
}

impl<T: Transportable + Eq + Hash> Transportable for HashSet<T> {
    const KIND: TypeKind = TypeKind::List;
}

impl<K: Transportable + Ord, V: Transportable> Transportable for BTreeMap<K, V> {
    const KIND: TypeKind = TypeKind::Map;
}

impl<K: Transportable + Eq + Hash, V: Transportable> Transportable for HashMap<K, V> {
    const KIND: TypeKind = TypeKind::Map;
}

impl<T: Transportable> Transportable for Option<T> {
    const KIND: TypeKind = TypeKind::Option;
}

impl<T: Transportable> Transportable for Box<T> {
    const KIND: TypeKind = T::KIND;
}

macro_rules! impl_transportable_tuple {
    ($($ty:ident),+) => {
        impl<$($ty: Transportable),+> Transportable for ($($ty,)+) {
            const KIND: TypeKind = TypeKind::Tuple;
        }
    };
}

impl_transportable_tuple!(T1);
impl_transportable_tuple!(T1, T2);
impl_transportable_tuple!(T1, T2, T3);
impl_transportable_tuple!(T1, T2, T3, T4);
impl_transportable_tuple!(T1, T2, T3, T4, T5);
impl_transportable_tuple!(T1, T2, T3, T4, T5, T6);
impl_transportable_tuple!(T1, T2, T3, T4, T5, T6, T7);
impl_transportable_tuple!(T1, T2, T3, T4, T5, T6, T7, T8);

// ============================================================================
// Argument Conversion
// ============================================================================

/// Converts a factory argument into the value actually stored in a message.
///
/// Transportable values are stored as themselves. Borrowed strings and
/// slices are stored as their owned counterparts so `make_message!("hi")`
/// produces a `String` slot.
pub trait IntoElement {
    /// The stored type.
    type Stored: Transportable;

    /// Performs the conversion.
    fn into_element(self) -> Self::Stored;
}

impl<T: Transportable> IntoElement for T {
    type Stored = T;

    fn into_element(self) -> T {
        self
    }
}

impl IntoElement for &str {
    type Stored = String;

    fn into_element(self) -> String {
        self.to_owned()
    }
}

impl<T: Transportable> IntoElement for &[T] {
    type Stored = Vec<T>;

    fn into_element(self) -> Vec<T> {
        self.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_macros::Transportable;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Transportable)]
    struct Marker;

    #[derive(Clone, Debug, Transportable)]
    struct NoFields {}

    #[derive(Clone, Debug, PartialEq, Eq, Transportable)]
    enum Direction {
        North,
        South,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Transportable)]
    enum Shape {
        Circle { radius: u32 },
        Square(u32),
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Transportable)]
    struct Wrapper<T> {
        inner: T,
    }

    #[derive(Clone, Debug)]
    struct Handle(std::sync::Arc<()>);

    allow_unsafe_message_type!(Handle);

    #[test]
    fn test_builtin_kinds() {
        assert_eq!(TypeTag::of::<()>().kind(), TypeKind::Unit);
        assert_eq!(TypeTag::of::<bool>().kind(), TypeKind::Bool);
        assert_eq!(TypeTag::of::<u64>().kind(), TypeKind::Integer);
        assert_eq!(TypeTag::of::<f32>().kind(), TypeKind::Float);
        assert_eq!(TypeTag::of::<String>().kind(), TypeKind::String);
        assert_eq!(TypeTag::of::<Vec<i32>>().kind(), TypeKind::List);
        assert_eq!(TypeTag::of::<[u8; 4]>().kind(), TypeKind::List);
        assert_eq!(TypeTag::of::<BTreeMap<String, i32>>().kind(), TypeKind::Map);
        assert_eq!(TypeTag::of::<(i32, String)>().kind(), TypeKind::Tuple);
        assert_eq!(TypeTag::of::<Option<i32>>().kind(), TypeKind::Option);
        assert_eq!(TypeTag::of::<Box<String>>().kind(), TypeKind::String);
    }

    #[test]
    fn test_derived_kinds() {
        assert_eq!(TypeTag::of::<Marker>().kind(), TypeKind::Empty);
        assert_eq!(TypeTag::of::<NoFields>().kind(), TypeKind::Empty);
        assert_eq!(TypeTag::of::<Direction>().kind(), TypeKind::Enum);
        assert_eq!(TypeTag::of::<Shape>().kind(), TypeKind::Inspectable);
        assert_eq!(
            TypeTag::of::<Wrapper<String>>().kind(),
            TypeKind::Inspectable
        );
        assert_eq!(TypeTag::of::<Handle>().kind(), TypeKind::Unsafe);
        assert!(!TypeKind::Unsafe.is_serializable());
    }

    #[test]
    fn test_inspectable_types_round_trip_through_serde() {
        let shape = Shape::Circle { radius: 3 };
        let json = serde_json::to_string(&shape).unwrap();
        let back: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shape);
    }

    #[test]
    fn test_tag_equality_is_by_type() {
        assert_eq!(TypeTag::of::<i32>(), TypeTag::of::<i32>());
        assert_ne!(TypeTag::of::<i32>(), TypeTag::of::<i64>());
        assert!(TypeTag::of::<String>().is::<String>());
        assert_eq!(TypeTag::of::<i32>().to_string(), "i32");
    }

    #[test]
    fn test_kind_classification() {
        assert!(TypeKind::Integer.is_primitive());
        assert!(!TypeKind::String.is_primitive());
        assert!(TypeKind::Map.is_aggregate());
        assert!(!TypeKind::Enum.is_aggregate());
    }

    #[test]
    fn test_into_element_converts_borrowed_values() {
        assert_eq!("hello".into_element(), String::from("hello"));
        assert_eq!([1u8, 2, 3][..].into_element(), vec![1u8, 2, 3]);
        assert_eq!(7i32.into_element(), 7);
    }
}
