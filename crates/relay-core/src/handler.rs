//! Statically typed handlers.
//!
//! A handler is any `Fn` taking references to [`Transportable`] values. The
//! blanket [`Handler`] implementations unpack a [`TupleView`] positionally and
//! pass each argument as a reference into the message storage.
//!
//! ```rust
//! use relay_core::{Handler, TupleView, make_message};
//!
//! fn greet(name: &String, times: &u32) {
//!     for _ in 0..*times {
//!         println!("hello {name}");
//!     }
//! }
//!
//! let msg = make_message!("ferris", 2u32);
//! let view = TupleView::new(&msg, &[0, 1], 2).unwrap();
//! Handler::call(&greet, &view).unwrap();
//! ```

use std::sync::Arc;

use crate::error::{ViewError, ViewResult};
use crate::types::{Transportable, TypeTag};
use crate::view::TupleView;

/// A handler's declared argument types.
pub trait ArgList: 'static {
    /// Number of arguments.
    const ARITY: usize;

    /// Type tags of the arguments, in declaration order.
    fn type_tags() -> Vec<TypeTag>;
}

impl ArgList for () {
    const ARITY: usize = 0;

    fn type_tags() -> Vec<TypeTag> {
        Vec::new()
    }
}

/// A callable that consumes a projected view of the matched values.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Calls the handler with the values of `view`.
    fn call(&self, view: &TupleView<'_>) -> ViewResult<()>;
}

/// A type-erased handler.
pub type BoxedTarget = Arc<dyn Fn(&TupleView<'_>) -> ViewResult<()> + Send + Sync>;

/// A type-erased handler taking no arguments.
pub type NullaryTarget = Arc<dyn Fn() + Send + Sync>;

/// Erases a handler's argument types.
pub fn into_target<F, Args>(handler: F) -> BoxedTarget
where
    F: Handler<Args>,
    Args: ArgList,
{
    Arc::new(move |view: &TupleView<'_>| handler.call(view))
}

/// Erases a handler that is known to take no arguments.
pub(crate) fn into_nullary<F, Args>(handler: F) -> NullaryTarget
where
    F: Handler<Args>,
    Args: ArgList,
{
    debug_assert_eq!(Args::ARITY, 0);
    Arc::new(move || {
        // The unit view always satisfies a nullary handler.
        let _ = handler.call(&TupleView::unit());
    })
}

impl<F> Handler<()> for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn call(&self, view: &TupleView<'_>) -> ViewResult<()> {
        if !view.is_empty() {
            return Err(ViewError::ArityMismatch {
                expected: 0,
                got: view.len(),
            });
        }
        (self)();
        Ok(())
    }
}

macro_rules! impl_handler {
    ($arity:literal; $($ty:ident : $idx:tt),+) => {
        impl<$($ty: Transportable),+> ArgList for ($($ty,)+) {
            const ARITY: usize = $arity;

            fn type_tags() -> Vec<TypeTag> {
                vec![$(TypeTag::of::<$ty>()),+]
            }
        }

        #[allow(non_snake_case)]
        impl<F, $($ty),+> Handler<($($ty,)+)> for F
        where
            F: Fn($(&$ty),+) + Send + Sync + 'static,
            $($ty: Transportable,)+
        {
            fn call(&self, view: &TupleView<'_>) -> ViewResult<()> {
                if view.len() != $arity {
                    return Err(ViewError::ArityMismatch {
                        expected: $arity,
                        got: view.len(),
                    });
                }
                $(
                    let $ty = view.try_get::<$ty>($idx)?;
                )+
                (self)($($ty),+);
                Ok(())
            }
        }
    };
}

impl_handler!(1; T1: 0);
impl_handler!(2; T1: 0, T2: 1);
impl_handler!(3; T1: 0, T2: 1, T3: 2);
impl_handler!(4; T1: 0, T2: 1, T3: 2, T4: 3);
impl_handler!(5; T1: 0, T2: 1, T3: 2, T4: 3, T5: 4);
impl_handler!(6; T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5);
impl_handler!(7; T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5, T7: 6);
impl_handler!(8; T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5, T7: 6, T8: 7);
impl_handler!(9; T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5, T7: 6, T8: 7, T9: 8);
impl_handler!(10; T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5, T7: 6, T8: 7, T9: 8, T10: 9);
impl_handler!(
    11; T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5, T7: 6, T8: 7, T9: 8, T10: 9, T11: 10
);
impl_handler!(
    12; T1: 0, T2: 1, T3: 2, T4: 3, T5: 4, T6: 5, T7: 6, T8: 7, T9: 8, T10: 9, T11: 10, T12: 11
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_message;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_arg_list_tags() {
        assert_eq!(<() as ArgList>::ARITY, 0);
        assert_eq!(<(i32, String) as ArgList>::ARITY, 2);
        assert_eq!(
            <(i32, String) as ArgList>::type_tags(),
            vec![TypeTag::of::<i32>(), TypeTag::of::<String>()]
        );
    }

    #[test]
    fn test_handler_receives_values_in_view_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |s: &String, n: &i32| sink.lock().unwrap().push(format!("{s}{n}"));

        let msg = make_message!(7i32, "x");
        let view = TupleView::new(&msg, &[1, 0], 2).unwrap();
        Handler::call(&handler, &view).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["x7".to_string()]);
    }

    #[test]
    fn test_handler_arguments_point_into_message() {
        let msg = make_message!(vec![1u8, 2, 3]);
        let addr = msg.get::<Vec<u8>>(0).unwrap() as *const Vec<u8> as usize;
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let handler = move |v: &Vec<u8>| sink.store(v as *const Vec<u8> as usize, Ordering::SeqCst);

        let view = TupleView::new(&msg, &[0], 1).unwrap();
        Handler::call(&handler, &view).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), addr);
    }

    #[test]
    fn test_handler_reports_type_mismatch() {
        let handler = |_: &String| {};
        let msg = make_message!(1i32);
        let view = TupleView::new(&msg, &[0], 1).unwrap();
        let err = Handler::call(&handler, &view).unwrap_err();
        assert!(matches!(err, ViewError::TypeMismatch { position: 0, .. }));
    }

    #[test]
    fn test_handler_reports_arity_mismatch() {
        let handler = |_: &i32, _: &i32| {};
        let msg = make_message!(1i32);
        let view = TupleView::new(&msg, &[0], 1).unwrap();
        assert_eq!(
            Handler::call(&handler, &view),
            Err(ViewError::ArityMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn test_nullary_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let target = into_nullary(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        target();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_boxed_target() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let target = into_target(move |n: &u64| {
            counter.fetch_add(*n as usize, Ordering::SeqCst);
        });

        let msg = make_message!(5u64);
        let view = TupleView::new(&msg, &[0], 1).unwrap();
        target(&view).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_twelve_arguments() {
        let handler = |a: &u8,
                       _: &u8,
                       _: &u8,
                       _: &u8,
                       _: &u8,
                       _: &u8,
                       _: &u8,
                       _: &u8,
                       _: &u8,
                       _: &u8,
                       _: &u8,
                       l: &u8| assert_eq!(*a + *l, 12);
        let msg = make_message!(1u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 0u8, 11u8);
        let binding: Vec<usize> = (0..12).collect();
        let view = TupleView::new(&msg, &binding, 12).unwrap();
        Handler::call(&handler, &view).unwrap();
    }
}
