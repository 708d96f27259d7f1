/*!
 * Bump and Prefix Allocator Tests
 */

use native_memory::{
    BumpAllocator, ByteOrder, ErrorKind, Layout, PrefixAllocator, Scope, Segment, SegmentAllocator,
};
use pretty_assertions::assert_eq;

#[test]
fn test_bounded_bump_packs_allocations() {
    let scope = Scope::confined();
    let bump = BumpAllocator::bounded(64, &scope).unwrap();
    assert!(bump.is_bounded());

    let a = bump.allocate(3, 1).unwrap();
    let b = bump.allocate(4, 4).unwrap();
    let c = bump.allocate(8, 8).unwrap();

    assert_eq!(a.segment_offset(&b), 4);
    assert_eq!(a.segment_offset(&c), 8);
    assert_eq!(bump.allocated_bytes(), 16);

    assert_eq!(
        bump.allocate(64, 1).unwrap_err().kind(),
        ErrorKind::AllocationFailure
    );
    bump.allocate(48, 1).unwrap();
    scope.close().unwrap();
    assert_eq!(
        bump.allocate(1, 1).unwrap_err().kind(),
        ErrorKind::LifecycleViolation
    );
}

#[test]
fn test_bump_over_caller_segment() {
    let backing = Segment::of_array(vec![0xffu8; 32]);
    let bump = BumpAllocator::over(backing.slice(8, 16).unwrap());

    let first = bump.allocate(8, 1).unwrap();
    first.fill(1).unwrap();
    assert!(bump.allocate(9, 1).is_err());

    let bytes = backing.to_vec().unwrap();
    assert_eq!(&bytes[..8], &[0xff; 8]);
    assert_eq!(&bytes[8..16], &[1; 8]);
}

#[test]
fn test_unbounded_bump_grows_past_first_chunk() {
    let scope = Scope::shared();
    let bump = BumpAllocator::unbounded(&scope).unwrap();
    assert!(!bump.is_bounded());

    let big = bump.allocate(256 * 1024, 64).unwrap();
    assert_eq!(big.address() % 64, 0);
    assert!(big.to_vec().unwrap().iter().all(|&b| b == 0));
    big.fill(9).unwrap();

    let small = bump.allocate(16, 8).unwrap();
    assert_eq!(small.to_vec().unwrap(), vec![0; 16]);
    assert!(bump.allocated_bytes() >= 256 * 1024);

    scope.close().unwrap();
    assert!(bump.allocate(1, 1).is_err());
    assert_eq!(bump.allocated_bytes(), 0);
}

#[test]
fn test_typed_allocation_helpers() {
    let bump = BumpAllocator::bounded(128, &Scope::implicit()).unwrap();

    let int = Layout::of::<i32>();
    let one = bump.allocate_value(&int, -7i32).unwrap();
    assert_eq!(one.get::<i32>(&int, 0).unwrap(), -7);

    let big = Layout::of_order::<u16>(ByteOrder::BigEndian);
    let array = bump.allocate_array(&big, &[0x0102u16, 0x0304]).unwrap();
    assert_eq!(array.to_vec().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(array.get_at_index::<u16>(&big, 1).unwrap(), 0x0304);

    let zeros = bump.allocate_sequence(&Layout::of::<u64>(), 3).unwrap();
    assert_eq!(zeros.byte_size(), 24);
    assert_eq!(zeros.address() % 8, 0);
}

#[test]
fn test_prefix_allocator_reuses_front() {
    let segment = Segment::allocate_native(32, 8, &Scope::implicit()).unwrap();
    let prefix = PrefixAllocator::new(segment.clone());

    let first = prefix.allocate(8, 8).unwrap();
    first.fill(0xaa).unwrap();
    let second = prefix.allocate(4, 64).unwrap();

    assert_eq!(first.address(), second.address());
    assert_eq!(second.address(), segment.address());
    assert_eq!(second.to_vec().unwrap(), vec![0xaa; 4]);
    assert_eq!(
        prefix.allocate(33, 1).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert!(prefix.segment().scope().same_as(segment.scope()));
}
