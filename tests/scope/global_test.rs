/*!
 * Global Scope Tests
 * Memory bound to the global scope stays usable for the whole process
 */

use native_memory::{BumpAllocator, PoolConfig, Scope, Segment, SegmentAllocator, SegmentPool};
use pretty_assertions::assert_eq;
use std::thread;

fn assert_filled(segment: &Segment, byte: u8) {
    assert!(segment.to_vec().unwrap().iter().all(|&b| b == byte));
}

#[test]
fn test_global_native_segments_stay_distinct() {
    let global = Scope::global();
    let a = global.allocate(4096, 64).unwrap();
    let b = global.allocate(4096, 64).unwrap();
    assert_ne!(a.address(), b.address());
    assert!(a.as_overlapping_slice(&b).is_none());

    a.fill(0x11).unwrap();
    b.fill(0xab).unwrap();
    assert_filled(&a, 0x11);
    assert_filled(&b, 0xab);

    let c = Segment::allocate_native(4096, 64, &global).unwrap();
    c.fill(0x5c).unwrap();
    assert_filled(&a, 0x11);
    assert_filled(&b, 0xab);
}

#[test]
fn test_global_segment_outlives_its_creator_thread() {
    let segment = thread::spawn(|| {
        let segment = Segment::allocate_native(256, 8, &Scope::global()).unwrap();
        segment.fill(7).unwrap();
        segment
    })
    .join()
    .unwrap();

    let other = Segment::allocate_native(256, 8, &Scope::global()).unwrap();
    other.fill(9).unwrap();
    assert_filled(&segment, 7);
    assert!(segment.scope().is_alive());
}

#[test]
fn test_pool_borrow_into_global_scope() {
    let pool = SegmentPool::with_config(&PoolConfig::uniform(4), &Scope::shared()).unwrap();
    let first = pool.borrow(100, 8, &Scope::global()).unwrap();
    let second = pool.borrow(100, 8, &Scope::global()).unwrap();
    assert_ne!(first.address(), second.address());

    first.fill(0xee).unwrap();
    second.fill(0x01).unwrap();
    assert_filled(&first, 0xee);
    assert_filled(&second, 0x01);

    // Nothing was released back to the pool
    let stats = pool.stats();
    assert_eq!(stats.total_queued(), 0);
    assert_eq!((stats.recycled, stats.freed), (0, 0));
}

#[test]
fn test_unbounded_bump_on_global_survives_allocator_drop() {
    let segment = {
        let bump = BumpAllocator::unbounded(&Scope::global()).unwrap();
        let segment = bump.allocate(512, 16).unwrap();
        segment.fill(0x42).unwrap();
        segment
    };

    let filler = Segment::allocate_native(512, 16, &Scope::global()).unwrap();
    filler.fill(0x99).unwrap();
    assert_filled(&segment, 0x42);
}
