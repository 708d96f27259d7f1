/*!
 * Segment Pool Recycling Tests
 * Bucket reuse, capacity limits, shutdown and the pool allocator
 */

use native_memory::{ErrorKind, PoolConfig, Scope, SegmentAllocator, SegmentPool};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

#[test]
fn test_released_block_is_reused() {
    let pool = SegmentPool::with_config(&PoolConfig::uniform(4), &Scope::shared()).unwrap();
    assert_eq!(SegmentPool::bucket_for(100, 1).unwrap(), 7);

    let first = Scope::confined();
    let segment = pool.borrow(100, 1, &first).unwrap();
    assert_eq!(segment.byte_size(), 100);
    segment.fill(0xcd).unwrap();
    let address = segment.address();
    first.close().unwrap();

    let stats = pool.stats();
    assert_eq!(stats.queued, vec![(7, 1)]);
    assert_eq!(stats.recycled, 1);

    let second = Scope::confined();
    let reused = pool.borrow(120, 1, &second).unwrap();
    assert_eq!(reused.address(), address);
    assert!(reused.to_vec().unwrap().iter().all(|&b| b == 0));
    second.close().unwrap();

    let stats = pool.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert_eq!(stats.hit_rate(), 0.5);
}

#[test]
fn test_full_bucket_frees_extra_blocks() {
    let config = PoolConfig::disabled().with_bucket_capacity(6, 1);
    let pool = SegmentPool::with_config(&config, &Scope::shared()).unwrap();

    let scope = Scope::confined();
    let a = pool.borrow(64, 8, &scope).unwrap();
    let b = pool.borrow(64, 8, &scope).unwrap();
    assert_ne!(a.address(), b.address());
    scope.close().unwrap();

    let stats = pool.stats();
    assert_eq!(stats.total_queued(), 1);
    assert_eq!(stats.recycled, 1);
    assert_eq!(stats.freed, 1);
}

#[test]
fn test_scope_close_invalidates_borrowed_segment() {
    let pool = SegmentPool::new(&Scope::shared()).unwrap();
    let scope = Scope::shared();
    let segment = pool.borrow(16, 8, &scope).unwrap();
    scope.close().unwrap();

    assert_eq!(
        segment.fill(1).unwrap_err().kind(),
        ErrorKind::LifecycleViolation
    );
}

#[test]
fn test_alignment_honored_on_reuse() {
    let pool = SegmentPool::with_config(&PoolConfig::uniform(2), &Scope::shared()).unwrap();
    for alignment in [1u64, 8, 64, 256] {
        let scope = Scope::confined();
        let segment = pool.borrow(256, alignment, &scope).unwrap();
        assert_eq!(segment.address() as u64 % alignment, 0);
        scope.close().unwrap();
    }
}

#[test]
fn test_shutdown_drains_and_frees_late_releases() {
    let pool_scope = Scope::shared();
    let pool = SegmentPool::with_config(&PoolConfig::uniform(8), &pool_scope).unwrap();

    let early = Scope::confined();
    pool.borrow(32, 8, &early).unwrap();
    pool.borrow(1024, 8, &early).unwrap();
    early.close().unwrap();
    assert_eq!(pool.stats().total_queued(), 2);

    let late = Scope::confined();
    let survivor = pool.borrow(32, 8, &late).unwrap();

    pool_scope.close().unwrap();
    assert!(pool.is_shut_down());
    assert_eq!(pool.bucket_capacity(5), 0);
    assert_eq!(pool.stats().total_queued(), 0);

    survivor.fill(7).unwrap();
    late.close().unwrap();

    let stats = pool.stats();
    assert_eq!(stats.total_queued(), 0);
    assert_eq!(stats.freed, 2);

    let err = pool.borrow(8, 8, &Scope::confined()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LifecycleViolation);
}

#[test]
fn test_pool_allocator_holds_pool_open() {
    let pool_scope = Scope::shared();
    let pool = SegmentPool::new(&pool_scope).unwrap();
    let target = Scope::confined();
    let allocator = pool.allocator(&target).unwrap();

    let segment = allocator.allocate(48, 16).unwrap();
    assert!(segment.scope().same_as(&target));
    assert!(allocator.target().same_as(&target));
    assert!(pool_scope.close().is_err());

    drop(allocator);
    target.close().unwrap();
    pool_scope.close().unwrap();
}

#[test]
fn test_concurrent_borrow_and_release() {
    let pool = Arc::new(SegmentPool::with_config(&PoolConfig::uniform(16), &Scope::shared()).unwrap());

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for round in 0..100u64 {
                    let scope = Scope::confined();
                    let size = 16 << (round % 4);
                    let segment = pool.borrow(size, 8, &scope).unwrap();
                    assert!(segment.to_vec().unwrap().iter().all(|&b| b == 0));
                    segment.fill(worker as u8).unwrap();
                    scope.close().unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.hits + stats.misses, 800);
    assert_eq!(stats.recycled + stats.freed, 800);
    assert!(stats.total_queued() <= 4 * 16);
}

#[test]
fn test_oversized_alignment_rejected() {
    let pool = SegmentPool::new(&Scope::shared()).unwrap();
    assert_eq!(
        pool.borrow(8, 3, &Scope::confined()).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
}
