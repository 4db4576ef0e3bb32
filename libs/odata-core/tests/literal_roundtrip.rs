use odata_core::{PrimitiveKind, Value};

#[test]
fn key_literal_roundtrip() {
    let v = Value::parse_literal(PrimitiveKind::String, "'ALFKI'").expect("parse");
    assert_eq!(v, Value::String("ALFKI".into()));
    assert_eq!(v.to_literal(), "'ALFKI'");
    let again = Value::parse_literal(PrimitiveKind::String, &v.to_literal()).expect("reparse");
    assert_eq!(v, again);
}

#[test]
fn guid_literal_roundtrip() {
    let raw = "guid'123e4567-e89b-12d3-a456-426614174000'";
    let v = Value::parse_literal(PrimitiveKind::Guid, raw).expect("parse");
    let again = Value::parse_literal(PrimitiveKind::Guid, &v.to_literal()).expect("reparse");
    assert_eq!(v, again);
}

#[test]
fn widened_int_renders_with_suffix() {
    let v = Value::parse_literal(PrimitiveKind::Int64, "42").expect("parse");
    assert_eq!(v.to_literal(), "42L");
    let again = Value::parse_literal(PrimitiveKind::Int64, "42L").expect("reparse");
    assert_eq!(v, again);
}

#[test]
fn datetime_literal_roundtrip() {
    let raw = "datetime'2008-10-13T12:30:00'";
    let v = Value::parse_literal(PrimitiveKind::DateTime, raw).expect("parse");
    let again = Value::parse_literal(PrimitiveKind::DateTime, &v.to_literal()).expect("reparse");
    assert_eq!(v, again);
}

#[test]
fn type_mismatch_is_rejected() {
    assert!(Value::parse_literal(PrimitiveKind::Int32, "'ALFKI'").is_err());
    assert!(Value::parse_literal(PrimitiveKind::Guid, "42").is_err());
}
