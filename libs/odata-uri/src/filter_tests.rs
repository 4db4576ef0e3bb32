use std::sync::Arc;

use odata_core::{PrimitiveKind, ResourceType};

use crate::ast::{BinaryOp, ExprNode, Function};
use crate::filter::parse_filter;
use odata_core::ODataError;

fn customer_type() -> Arc<ResourceType> {
    let address = Arc::new(
        ResourceType::complex("Address")
            .with_primitive("City", PrimitiveKind::String)
            .with_primitive("Zip", PrimitiveKind::String),
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
            .with_primitive("Revenue", PrimitiveKind::Double)
            .with_primitive("Employees", PrimitiveKind::Int32)
            .with_primitive("Founded", PrimitiveKind::DateTime)
            .with_complex("Address", address)
            .with_reference("LastOrder", Arc::clone(&order))
            .with_set_reference("Orders", order)
            .with_primitive_bag("Tags", PrimitiveKind::String),
    )
}

#[test]
fn precedence_puts_or_outermost() {
    let ty = customer_type();
    let expr = parse_filter("CompanyName eq 'A' or Employees gt 3 and Revenue lt 9.5", &ty)
        .expect("parse");
    match expr.node {
        ExprNode::Binary(BinaryOp::Or, _, right) => match right.node {
            ExprNode::Binary(BinaryOp::And, _, _) => {}
            other => panic!("expected and under or, got {other:?}"),
        },
        other => panic!("expected or at root, got {other:?}"),
    }
}

#[test]
fn arithmetic_binds_tighter_than_comparison() {
    let ty = customer_type();
    let expr = parse_filter("Employees add 1 mul 2 eq 5", &ty).expect("parse");
    match expr.node {
        ExprNode::Binary(BinaryOp::Eq, left, _) => match left.node {
            ExprNode::Binary(BinaryOp::Add, _, mul) => {
                assert!(matches!(mul.node, ExprNode::Binary(BinaryOp::Mul, _, _)));
            }
            other => panic!("expected add, got {other:?}"),
        },
        other => panic!("expected eq, got {other:?}"),
    }
}

#[test]
fn complex_path_resolves() {
    let ty = customer_type();
    let expr = parse_filter("Address/City eq 'Berlin'", &ty).expect("parse");
    match expr.node {
        ExprNode::Binary(BinaryOp::Eq, left, _) => match left.node {
            ExprNode::Property(path) => {
                assert_eq!(path.steps.len(), 2);
                assert_eq!(path.steps[1].name, "City");
                assert_eq!(path.navigations().count(), 0);
            }
            other => panic!("expected property, got {other:?}"),
        },
        other => panic!("expected eq, got {other:?}"),
    }
}

#[test]
fn navigation_path_records_navigations() {
    let ty = customer_type();
    let expr = parse_filter("LastOrder/Freight gt 10.0m", &ty).expect("parse");
    match expr.node {
        ExprNode::Binary(BinaryOp::Gt, left, _) => match left.node {
            ExprNode::Property(path) => {
                assert_eq!(path.navigations().collect::<Vec<_>>(), vec!["LastOrder"]);
            }
            other => panic!("expected property, got {other:?}"),
        },
        other => panic!("expected gt, got {other:?}"),
    }
}

#[test]
fn unknown_property_is_not_found() {
    let ty = customer_type();
    let err = parse_filter("Missing eq 1", &ty).unwrap_err();
    assert!(matches!(err, ODataError::ResourceNotFound(_)));
    assert_eq!(
        err.to_string(),
        "Type 'Customer' does not have a property named 'Missing'"
    );
}

#[test]
fn type_mismatches_are_syntax_errors() {
    let ty = customer_type();
    assert!(matches!(
        parse_filter("CompanyName gt 5", &ty).unwrap_err(),
        ODataError::Syntax(_)
    ));
    assert!(matches!(
        parse_filter("Founded add 1", &ty).unwrap_err(),
        ODataError::Syntax(_)
    ));
    assert!(matches!(
        parse_filter("not Employees", &ty).unwrap_err(),
        ODataError::Syntax(_)
    ));
}

#[test]
fn non_boolean_top_level_is_rejected() {
    let ty = customer_type();
    let err = parse_filter("Employees add 1", &ty).unwrap_err();
    assert!(err.to_string().contains("must evaluate to a boolean"));
}

#[test]
fn set_navigation_and_bags_are_rejected() {
    let ty = customer_type();
    assert!(parse_filter("Orders/Freight gt 1", &ty).is_err());
    assert!(parse_filter("Tags eq 'x'", &ty).is_err());
}

#[test]
fn functions_type_check() {
    let ty = customer_type();
    let expr = parse_filter("startswith(CompanyName, 'Al')", &ty).expect("parse");
    assert!(matches!(
        expr.node,
        ExprNode::Function(Function::StartsWith, _)
    ));

    let expr =
        parse_filter("substring(CompanyName, 1, 2) eq 'lf'", &ty).expect("three-arg substring");
    match expr.node {
        ExprNode::Binary(BinaryOp::Eq, left, _) => {
            assert!(matches!(left.node, ExprNode::Function(Function::Substring, _)));
        }
        other => panic!("expected eq, got {other:?}"),
    }

    let err = parse_filter("startswith(CompanyName, 5)", &ty).unwrap_err();
    assert!(err.to_string().contains("No applicable function"));

    let err = parse_filter("year(CompanyName) eq 2008", &ty).unwrap_err();
    assert!(err.to_string().contains("No applicable function"));

    assert!(parse_filter("shout(CompanyName)", &ty).is_err());
}

#[test]
fn null_comparisons_parse() {
    let ty = customer_type();
    assert!(parse_filter("CompanyName eq null", &ty).is_ok());
    assert!(parse_filter("null ne Employees", &ty).is_ok());
}

#[test]
fn unbalanced_parens_are_rejected() {
    let ty = customer_type();
    assert!(parse_filter("(CompanyName eq 'A'", &ty).is_err());
    assert!(parse_filter("CompanyName eq 'A')", &ty).is_err());
}
