/*!
 * Layout Descriptor Tests
 * JSON descriptors, rendering and alignment overrides
 */

use native_memory::{ByteOrder, ErrorKind, Layout, LayoutKind, PathElement};
use pretty_assertions::assert_eq;

const POINT_JSON: &str = r#"{
    "type": "group",
    "group": "struct",
    "name": "point",
    "members": [
        { "type": "value", "bits": 32, "order": "little_endian", "name": "x" },
        { "type": "value", "bits": 32, "order": "big_endian", "name": "y" },
        { "type": "padding", "bits": 64 }
    ]
}"#;

#[test]
fn test_descriptor_from_json() {
    let point = Layout::from_json(POINT_JSON).unwrap();
    assert_eq!(point.name(), Some("point"));
    assert_eq!(point.byte_size().unwrap(), 16);
    assert_eq!(point.byte_alignment(), 8);
    assert_eq!(point.to_string(), "[b32(x)B32(y)x64](point)");

    let y = point.select(&[PathElement::name("y")]).unwrap();
    assert_eq!(y.order(), Some(ByteOrder::BigEndian));
    assert_eq!(point.byte_offset(&[PathElement::name("y")]).unwrap(), 4);
}

#[test]
fn test_descriptor_survives_serialization() {
    let layout = Layout::sequence(
        4,
        Layout::union(vec![
            Layout::of_order::<u16>(ByteOrder::LittleEndian).with_name("half"),
            Layout::of_order::<u64>(ByteOrder::BigEndian),
        ]),
    )
    .with_byte_alignment(16)
    .unwrap();

    let json = layout.to_json().unwrap();
    let parsed = Layout::from_json(&json).unwrap();
    assert_eq!(parsed, layout);
    assert_eq!(parsed.byte_alignment(), 16);
    assert_eq!(parsed.to_string(), "128%[4:[b16(half)|B64]]");
}

#[test]
fn test_unbounded_sequence_descriptor() {
    let json = r#"{ "type": "sequence", "element": { "type": "value", "bits": 8, "order": "little_endian" } }"#;
    let layout = Layout::from_json(json).unwrap();

    assert!(!layout.has_size());
    assert!(matches!(
        layout.kind(),
        LayoutKind::Sequence { count: None, .. }
    ));
    assert_eq!(layout.to_string(), "[:b8]");
    assert_eq!(
        layout.bit_size().unwrap_err().kind(),
        ErrorKind::UnsupportedOperation
    );
}

#[test]
fn test_invalid_descriptors_rejected() {
    let cases = [
        r#"{ "type": "value", "bits": 24, "order": "little_endian" }"#,
        r#"{ "type": "padding", "bits": 0 }"#,
        r#"{ "type": "padding", "bits": 8, "bit_alignment": 12 }"#,
        r#"{ "type": "group", "group": "struct", "members": [{ "type": "padding", "bits": 0 }] }"#,
        r#"{ "type": "matrix" }"#,
        "not json",
    ];
    for json in cases {
        assert_eq!(
            Layout::from_json(json).unwrap_err().kind(),
            ErrorKind::InvalidArgument,
            "descriptor accepted: {}",
            json
        );
    }
}

#[test]
fn test_alignment_overrides() {
    assert_eq!(
        Layout::of::<u8>().with_bit_alignment(4).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert!(Layout::of::<u8>().with_bit_alignment(24).is_err());

    let hyper = Layout::of::<u32>().with_byte_alignment(64).unwrap();
    assert!(!hyper.has_natural_alignment());
    assert_eq!(hyper.byte_alignment(), 64);
    assert_eq!(hyper.byte_size().unwrap(), 4);

    let holder = Layout::structure(vec![hyper, Layout::of::<u8>()]);
    assert_eq!(holder.byte_alignment(), 64);
    assert!(holder.has_natural_alignment());
}

#[test]
fn test_padding_alignment() {
    assert_eq!(Layout::padding(32).unwrap().bit_alignment(), 32);
    assert_eq!(Layout::padding(24).unwrap().bit_alignment(), 8);
    assert_eq!(Layout::padding(3).unwrap().bit_alignment(), 8);
    assert_eq!(
        Layout::padding(3).unwrap().byte_size().unwrap_err().kind(),
        ErrorKind::UnsupportedOperation
    );
}
