/*!
 * Segment Access Tests
 * Typed access, check ordering and view derivation
 */

use native_memory::{
    AccessModes, ByteOrder, ErrorKind, Layout, MemoryError, Scope, Segment, SegmentAllocator,
};
use pretty_assertions::assert_eq;

#[test]
fn test_allocated_segment_is_zeroed() {
    let scope = Scope::confined();
    let segment = scope.allocate(100, 8).unwrap();
    assert_eq!(segment.byte_size(), 100);
    assert_eq!(segment.address() % 8, 0);
    assert!(segment.to_vec().unwrap().iter().all(|&b| b == 0));
    assert_eq!(segment.modes(), AccessModes::ALL);
    scope.close().unwrap();
}

#[test]
fn test_int_read_at_boundary() {
    let segment = Segment::allocate_native(100, 8, &Scope::implicit()).unwrap();
    let int = Layout::of::<i32>();

    segment.set(&int, 96, 0x1234_5678i32).unwrap();
    assert_eq!(segment.get::<i32>(&int, 96).unwrap(), 0x1234_5678);

    let err = segment.get::<i32>(&int, 97).unwrap_err();
    assert!(matches!(
        err,
        MemoryError::OutOfBounds {
            offset: 97,
            length: 4,
            size: 100
        }
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_zero_length_segment() {
    let segment = Segment::allocate_native(0, 1, &Scope::implicit()).unwrap();
    assert!(segment.is_empty());
    assert!(segment.to_vec().unwrap().is_empty());
    assert!(segment.get::<u8>(&Layout::of::<u8>(), 0).is_err());
    assert_eq!(segment.slice(0, 0).unwrap().byte_size(), 0);
}

#[test]
fn test_read_only_then_closed_reports_lifecycle_first() {
    let scope = Scope::confined();
    let segment = scope.allocate(8, 8).unwrap();
    let read_only = segment.as_read_only();
    scope.close().unwrap();

    let err = read_only.set(&Layout::of::<u64>(), 64, 1u64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LifecycleViolation);
}

#[test]
fn test_mode_checked_before_bounds() {
    let segment = Segment::allocate_native(8, 8, &Scope::implicit()).unwrap();
    let read_only = segment.as_read_only();
    let err = read_only.write_bytes(64, &[1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[test]
fn test_slices_share_memory() {
    let segment = Segment::allocate_native(16, 8, &Scope::implicit()).unwrap();
    let second_half = segment.slice(8, 8).unwrap();
    let long = Layout::of::<u64>();

    second_half.set(&long, 0, u64::MAX).unwrap();
    assert_eq!(segment.get::<u64>(&long, 8).unwrap(), u64::MAX);
    assert!(second_half.scope().same_as(segment.scope()));

    let nested = second_half.slice(4, 4).unwrap();
    assert_eq!(nested.address(), segment.address() + 12);
    assert!(second_half.slice(4, 5).is_err());
}

#[test]
fn test_views_keep_restrictions() {
    let segment = Segment::allocate_native(8, 8, &Scope::implicit()).unwrap();
    let view = segment.as_read_only().as_pinned().slice(2, 2).unwrap();
    assert!(view.is_read_only());
    assert!(view.is_pinned());
    assert_eq!(format!("{:?}", view.modes()), "r--");
}

#[test]
fn test_big_endian_double() {
    let segment = Segment::allocate_native(8, 8, &Scope::implicit()).unwrap();
    let big = Layout::of_order::<f64>(ByteOrder::BigEndian);
    segment.set(&big, 0, 1.5f64).unwrap();

    assert_eq!(segment.to_vec().unwrap(), 1.5f64.to_be_bytes().to_vec());
    assert_eq!(segment.get::<f64>(&big, 0).unwrap(), 1.5);
}

#[test]
fn test_of_array_round_trips_values() {
    let segment = Segment::of_array(vec![10i64, -20, 30]);
    let long = Layout::of::<i64>();
    assert_eq!(segment.byte_size(), 24);
    assert_eq!(segment.get_at_index::<i64>(&long, 1).unwrap(), -20);

    segment.set_at_index(&long, 2, 99i64).unwrap();
    assert_eq!(segment.get::<i64>(&long, 16).unwrap(), 99);
    assert!(segment.close().is_err());
}

#[test]
fn test_allocate_layout_uses_size_and_alignment() {
    let point = Layout::structure(vec![Layout::of::<i32>(), Layout::of::<i32>()]);
    let segment = Segment::allocate_layout(&point, &Scope::implicit()).unwrap();
    assert_eq!(segment.byte_size(), 8);
    assert_eq!(segment.address() % 4, 0);

    let unbounded = Layout::unbounded_sequence(Layout::of::<u8>());
    let err = Segment::allocate_layout(&unbounded, &Scope::implicit()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
}

#[test]
fn test_raw_parts_over_borrowed_memory() {
    let mut backing = [0u8; 16];
    let scope = Scope::confined();
    // SAFETY: `backing` outlives the scope, which is closed below
    let segment =
        unsafe { Segment::from_raw_parts(backing.as_mut_ptr() as usize, 16, &scope) }.unwrap();
    segment.fill(0x5a).unwrap();
    scope.close().unwrap();

    assert_eq!(backing, [0x5a; 16]);
}
