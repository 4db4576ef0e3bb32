use std::sync::Arc;

use odata_core::{FieldValue, PrimitiveKind, Record, ResourceType, Value, ValueMap};

use crate::compiler::compile_filter;
use crate::filter::parse_filter;

fn customer_type() -> Arc<ResourceType> {
    let address = Arc::new(
        ResourceType::complex("Address").with_primitive("City", PrimitiveKind::String),
    );
    let order = Arc::new(
        ResourceType::entity("Order")
            .with_key("OrderID", PrimitiveKind::Int32)
            .with_primitive("Freight", PrimitiveKind::Decimal),
    );
    Arc::new(
        ResourceType::entity("Customer")
            .with_key("CustomerID", PrimitiveKind::String)
            .with_primitive("CompanyName", PrimitiveKind::String)
            .with_primitive("Employees", PrimitiveKind::Int32)
            .with_primitive("Founded", PrimitiveKind::DateTime)
            .with_complex("Address", address)
            .with_reference("LastOrder", order),
    )
}

fn matches(filter: &str, row: &dyn Record) -> bool {
    let ty = customer_type();
    let expr = parse_filter(filter, &ty).expect("parse");
    let info = compile_filter(expr);
    (info.predicate)(row)
}

fn alfki() -> ValueMap {
    ValueMap::new()
        .with_value("CustomerID", Value::String("ALFKI".into()))
        .with_value("CompanyName", Value::String("Alfreds Futterkiste".into()))
        .with_value("Employees", Value::Int32(12))
}

#[test]
fn comparisons_and_logic() {
    let row = alfki();
    assert!(matches("Employees gt 10", &row));
    assert!(matches("Employees gt 10 and CompanyName ne 'X'", &row));
    assert!(!matches("Employees gt 10 and CompanyName eq 'X'", &row));
    assert!(matches("Employees lt 5 or startswith(CompanyName, 'Alf')", &row));
    assert!(matches("not (Employees eq 13)", &row));
}

#[test]
fn arithmetic_in_predicates() {
    let row = alfki();
    assert!(matches("Employees add 3 eq 15", &row));
    assert!(matches("Employees mod 5 eq 2", &row));
    assert!(matches("Employees div 4 eq 3", &row));
    assert!(matches("-Employees lt 0", &row));
}

#[test]
fn null_semantics() {
    let row = alfki(); // no Founded value
    assert!(matches("Founded eq null", &row));
    assert!(!matches("Founded ne null", &row));
    // Unknown outcomes exclude the row.
    assert!(!matches("Founded gt datetime'2000-01-01T00:00:00'", &row));
    assert!(!matches("year(Founded) eq 2000", &row));
    // But a definite arm of a disjunction still matches.
    assert!(matches("Founded gt datetime'2000-01-01T00:00:00' or Employees eq 12", &row));
}

#[test]
fn division_by_zero_is_unknown() {
    let row = alfki();
    assert!(!matches("Employees div 0 eq 1", &row));
    assert!(!matches("Employees div 0 ne 1", &row));
}

#[test]
fn paths_traverse_records() {
    let address = ValueMap::new()
        .with_value("City", Value::String("Berlin".into()))
        .into_record();
    let row = alfki().with_field("Address", FieldValue::Record(address));
    assert!(matches("Address/City eq 'Berlin'", &row));
    assert!(!matches("Address/City eq 'London'", &row));

    // Missing intermediate record makes the comparison unknown.
    let bare = alfki();
    assert!(!matches("Address/City eq 'Berlin'", &bare));
    assert!(matches("Address/City eq null", &bare));
}

#[test]
fn string_functions() {
    let row = alfki();
    assert!(matches("substringof('Futter', CompanyName)", &row));
    assert!(matches("endswith(CompanyName, 'kiste')", &row));
    assert!(matches("length(CustomerID) eq 5", &row));
    assert!(matches("indexof(CompanyName, 'Futter') eq 8", &row));
    assert!(matches("toupper(CustomerID) eq 'ALFKI'", &row));
    assert!(matches("substring(CompanyName, 8) eq 'Futterkiste'", &row));
    assert!(matches("substring(CompanyName, 8, 6) eq 'Futter'", &row));
    assert!(matches("concat(CustomerID, '!') eq 'ALFKI!'", &row));
    assert!(matches("replace(CustomerID, 'ALF', 'X') eq 'XKI'", &row));
    assert!(matches("trim('  x  ') eq 'x'", &row));
}

#[test]
fn datetime_and_math_functions() {
    let row = alfki().with_value(
        "Founded",
        Value::parse_literal(PrimitiveKind::DateTime, "datetime'2008-10-13T12:30:45'")
            .expect("datetime"),
    );
    assert!(matches("year(Founded) eq 2008", &row));
    assert!(matches("month(Founded) eq 10", &row));
    assert!(matches("day(Founded) eq 13", &row));
    assert!(matches("hour(Founded) eq 12", &row));
    assert!(matches("minute(Founded) eq 30", &row));
    assert!(matches("second(Founded) eq 45", &row));
    assert!(matches("floor(Employees add 0.5) eq 12", &row));
    assert!(matches("ceiling(Employees add 0.5) eq 13", &row));
    assert!(matches("round(10.4) eq 10", &row));
}

#[test]
fn referenced_navigations_are_collected() {
    let ty = customer_type();
    let expr = parse_filter("LastOrder/Freight gt 1.0m and Address/City eq 'B'", &ty)
        .expect("parse");
    let info = compile_filter(expr);
    assert_eq!(
        info.referenced_navigations.iter().collect::<Vec<_>>(),
        vec!["LastOrder"]
    );
}
