//! Heap usage of the dispatch path.
//!
//! Probing a message that does not match must not allocate. A successful
//! probe may allocate the binding once.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use relay_core::{Behavior, Invokable, MatchPolicy, Message, Pattern, make_message};

struct CountingAllocator;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

/// Counts allocations made by `f` on the current thread.
fn allocations_during(f: impl FnOnce()) -> usize {
    let before = ALLOCATIONS.with(Cell::get);
    f();
    ALLOCATIONS.with(Cell::get) - before
}

fn unmatched() -> Message {
    make_message!("no", "ints", "here")
}

#[test]
fn test_failed_get_intermediate_does_not_allocate() {
    let unit = Invokable::on(|_: &i32, _: &String| {});
    let msg = unmatched();
    assert!(unit.get_intermediate(&msg).is_none());

    let count = allocations_during(|| {
        assert!(unit.get_intermediate(&msg).is_none());
    });
    assert_eq!(count, 0);
}

#[test]
fn test_failed_invoke_does_not_allocate() {
    let unit = Invokable::on(|_: &String, _: &i32| {});
    let msg = make_message!("partial", "match");
    assert!(!unit.invoke(&msg));

    let count = allocations_during(|| {
        assert!(!unit.invoke(&msg));
    });
    assert_eq!(count, 0);
}

#[test]
fn test_failed_behavior_probe_does_not_allocate() {
    let behavior = Behavior::new()
        .on(|_: &i32| {})
        .on(|_: &i32, _: &String| {})
        .on_with(MatchPolicy::Exact, |_: &String| {});
    let msg = unmatched();
    assert!(behavior.get_intermediate(&msg).is_none());

    let count = allocations_during(|| {
        assert!(behavior.get_intermediate(&msg).is_none());
        assert!(!behavior.invoke(&msg));
    });
    assert_eq!(count, 0);
}

#[test]
fn test_rejecting_guard_does_not_allocate() {
    let pattern = Pattern::of::<(i32,)>().guard(|view| view.get::<i32>(0) == Some(&42));
    let unit = Invokable::with_matcher(pattern, |_: &i32| {}).unwrap();
    let msg = make_message!(1i32, 42i32);
    assert!(unit.get_intermediate(&msg).is_none());

    let count = allocations_during(|| {
        assert!(unit.get_intermediate(&msg).is_none());
    });
    assert_eq!(count, 0);
}

#[test]
fn test_successful_probe_allocates_at_most_once() {
    let unit = Invokable::on(|_: &i32, _: &String| {});
    let msg = make_message!(1i32, 2i32, "three");
    unit.get_intermediate(&msg).unwrap().invoke();

    let mut intermediate = None;
    let count = allocations_during(|| {
        intermediate = unit.get_intermediate(&msg);
    });
    assert!(count <= 1, "{count} allocations");

    let count = allocations_during(|| {
        assert!(unit.invoke(&msg));
    });
    assert!(count <= 1, "{count} allocations");

    intermediate.unwrap().invoke();
}
