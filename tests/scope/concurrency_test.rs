/*!
 * Scope Concurrency Tests
 * Confinement and close racing against in-flight shared accesses
 */

use native_memory::{ErrorKind, MemoryError, Scope, Segment, SegmentAllocator};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_confined_segment_rejects_foreign_threads() {
    let scope = Scope::confined();
    let segment = scope.allocate(8, 8).unwrap();

    let remote_segment = segment.clone();
    let remote_scope = scope.clone();
    let (access, close) = thread::spawn(move || {
        (
            remote_segment.fill(1).unwrap_err(),
            remote_scope.close().unwrap_err(),
        )
    })
    .join()
    .unwrap();

    assert!(matches!(access, MemoryError::WrongThread { .. }));
    assert_eq!(close.kind(), ErrorKind::LifecycleViolation);
    assert!(segment.to_vec().is_ok());
    scope.close().unwrap();
}

#[test]
fn test_close_races_with_shared_accesses() {
    let scope = Scope::shared();
    let segment = scope.allocate(4096, 8).unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let completed = Arc::new(AtomicU64::new(0));
    let barrier = Arc::new(Barrier::new(5));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let segment = segment.clone();
            let stop = Arc::clone(&stop);
            let completed = Arc::clone(&completed);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                while !stop.load(Ordering::Relaxed) {
                    match segment.to_vec() {
                        Ok(bytes) => {
                            assert_eq!(bytes.len(), 4096);
                            completed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            assert!(matches!(err, MemoryError::ScopeClosed { .. }));
                            return;
                        }
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    let mut attempts = 0u64;
    loop {
        attempts += 1;
        match scope.close() {
            Ok(()) => break,
            Err(MemoryError::ScopeAcquired { .. }) => {
                // Let the workers drain if close keeps losing the race
                if attempts > 10_000 {
                    stop.store(true, Ordering::Relaxed);
                }
                thread::yield_now();
            }
            Err(other) => panic!("unexpected close failure: {}", other),
        }
    }
    stop.store(true, Ordering::Relaxed);
    for worker in workers {
        worker.join().unwrap();
    }

    assert!(attempts >= 1);
    assert!(!scope.is_alive());
    assert_eq!(
        segment.to_vec().unwrap_err().kind(),
        ErrorKind::LifecycleViolation
    );
}

#[test]
fn test_handoff_between_threads() {
    let segment = Segment::allocate_native(16, 8, &Scope::confined()).unwrap();
    segment.fill(5).unwrap();

    let shared = segment.as_shared().unwrap();
    let remote = shared.clone();
    let bytes = thread::spawn(move || remote.to_vec().unwrap())
        .join()
        .unwrap();
    assert_eq!(bytes, vec![5; 16]);
    shared.close().unwrap();
}

#[test]
fn test_many_handles_across_threads() {
    let scope = Scope::shared();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let scope = scope.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    scope.acquire().unwrap().release();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(scope.acquired_count(), 0);
    scope.close().unwrap();
}
