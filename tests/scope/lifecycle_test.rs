/*!
 * Scope Lifecycle Tests
 * Close semantics, close actions, handles and implicit release
 */

use native_memory::{ErrorKind, MemoryError, Scope, ScopeKind, Segment, SegmentAllocator};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_close_once_then_fail() {
    let scope = Scope::confined();
    assert_eq!(scope.kind(), ScopeKind::Confined);
    scope.close().unwrap();

    let err = scope.close().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LifecycleViolation);
}

#[test]
fn test_close_actions_run_exactly_once_in_reverse() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let scope = Scope::shared();
    for name in ["first", "second", "third"] {
        let log = Arc::clone(&log);
        scope
            .add_close_action(move || log.lock().unwrap().push(name))
            .unwrap();
    }

    scope.close().unwrap();
    assert!(scope.close().is_err());
    drop(scope);

    assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
}

#[test]
fn test_segments_invalid_after_close() {
    let scope = Scope::confined();
    let segment = scope.allocate(32, 8).unwrap();
    let slice = segment.slice(8, 8).unwrap();
    let read_only = segment.as_read_only();

    scope.close().unwrap();

    for view in [&segment, &slice, &read_only] {
        assert!(!view.is_alive());
        assert_eq!(
            view.to_vec().unwrap_err().kind(),
            ErrorKind::LifecycleViolation
        );
    }
}

#[test]
fn test_handle_blocks_close_until_released() {
    let scope = Scope::shared();
    let handle = scope.acquire().unwrap();

    match scope.close() {
        Err(MemoryError::ScopeAcquired { count, .. }) => assert_eq!(count, 1),
        other => panic!("expected acquired error, got {:?}", other),
    }
    assert!(scope.is_alive());

    handle.release();
    scope.close().unwrap();
    assert!(scope.acquire().is_err());
}

#[test]
fn test_implicit_scope_frees_when_last_view_drops() {
    let released = Arc::new(AtomicUsize::new(0));
    let segment = {
        let scope = Scope::implicit();
        let counter = Arc::clone(&released);
        scope
            .add_close_action(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        scope.allocate(16, 1).unwrap()
    };

    let view = segment.slice(0, 4).unwrap();
    drop(segment);
    assert_eq!(released.load(Ordering::SeqCst), 0);
    view.fill(1).unwrap();

    drop(view);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_implicit_and_global_refuse_explicit_close() {
    let implicit = Scope::implicit();
    assert!(matches!(
        implicit.close(),
        Err(MemoryError::NotCloseable { .. })
    ));
    assert!(implicit.is_alive());

    let global = Scope::global();
    assert_eq!(global.kind(), ScopeKind::Global);
    assert!(global.close().is_err());
    let segment = Segment::allocate_native(8, 8, &global).unwrap();
    segment.fill(3).unwrap();
}

#[test]
fn test_keep_alive_chain() {
    let base = Scope::shared();
    let middle = Scope::shared();
    let top = Scope::confined();
    middle.keep_alive(&base).unwrap();
    top.keep_alive(&middle).unwrap();

    assert!(base.close().is_err());
    assert!(middle.close().is_err());

    top.close().unwrap();
    middle.close().unwrap();
    base.close().unwrap();
}

#[test]
fn test_confined_with() {
    let outcome = Scope::confined_with(|scope| {
        let segment = scope.allocate(4, 4).unwrap();
        segment.fill(0x11).unwrap();
        segment.to_vec().unwrap()
    })
    .unwrap();
    assert_eq!(outcome, vec![0x11; 4]);

    let leaked = Scope::confined_with(|scope| scope.acquire().unwrap());
    assert!(leaked.is_err());
}
