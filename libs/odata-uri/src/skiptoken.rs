//! `$skiptoken` parsing.
//!
//! A skip token is the comma-separated literal list a previous response
//! emitted in its next-link; each literal is typed by the ordering clause
//! at the same position, `null` marking a null sort key.

use odata_core::{ODataError, ODataResult, Value};

use crate::orderby::OrderByInfo;
use crate::text::split_outside_quotes;

/// Parsed resume point, one entry per ordering clause.
#[derive(Clone, Debug, PartialEq)]
pub struct SkipTokenInfo {
    pub values: Vec<Option<Value>>,
}

/// Parse `raw` against the full ordering of the request.
///
/// # Errors
/// `Syntax` when the token arity does not match the ordering, or any
/// literal fails to parse as the kind of its clause.
pub fn parse_skip_token(raw: &str, order: &OrderByInfo) -> ODataResult<SkipTokenInfo> {
    let parts = split_outside_quotes(raw, ',');
    let expected = order.segments().len();
    if parts.len() != expected {
        return Err(ODataError::syntax(format!(
            "The number of keys '{}' in the skip token with value '{raw}' did not match the number of ordering constraints '{expected}' for the resource",
            parts.len()
        )));
    }
    let mut values = Vec::with_capacity(expected);
    for (part, segment) in parts.iter().zip(order.segments()) {
        let part = part.trim();
        if part == "null" {
            values.push(None);
        } else {
            values.push(Some(Value::parse_literal(segment.result_kind(), part)?));
        }
    }
    Ok(SkipTokenInfo { values })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use odata_core::{MetadataCache, PrimitiveKind, ResourceType, Value, ValueMap};

    use super::*;
    use crate::orderby::parse_orderby;

    fn order_type() -> Arc<ResourceType> {
        Arc::new(
            ResourceType::entity("Order")
                .with_key("OrderID", PrimitiveKind::Int32)
                .with_primitive("ShipName", PrimitiveKind::String),
        )
    }

    #[test]
    fn typed_values_parse_in_clause_order() {
        let ty = order_type();
        let cache = MetadataCache::new();
        let order = parse_orderby(Some("ShipName desc"), &ty, true, &cache)
            .expect("parse")
            .expect("some");
        let token = parse_skip_token("'Vins et alcools',10248", &order).expect("token");
        assert_eq!(
            token.values,
            vec![
                Some(Value::String("Vins et alcools".into())),
                Some(Value::Int32(10248)),
            ]
        );
    }

    #[test]
    fn arity_mismatch_carries_both_counts() {
        let ty = order_type();
        let cache = MetadataCache::new();
        let order = parse_orderby(None, &ty, true, &cache)
            .expect("parse")
            .expect("some");
        let err = parse_skip_token("1,2", &order).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The number of keys '2' in the skip token with value '1,2' did not match the number of ordering constraints '1' for the resource"
        );
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let ty = order_type();
        let cache = MetadataCache::new();
        let order = parse_orderby(None, &ty, true, &cache)
            .expect("parse")
            .expect("some");
        assert!(parse_skip_token("'abc'", &order).is_err());
    }

    #[test]
    fn roundtrip_through_build_skip_token() {
        let ty = order_type();
        let cache = MetadataCache::new();
        let order = parse_orderby(Some("ShipName"), &ty, true, &cache)
            .expect("parse")
            .expect("some");
        let row = ValueMap::new()
            .with_value("OrderID", Value::Int32(7))
            .with_value("ShipName", Value::String("it's a ship".into()));
        let token = order.build_skip_token(&row);
        assert_eq!(token, "'it''s a ship',7");
        let parsed = parse_skip_token(&token, &order).expect("reparse");
        assert_eq!(parsed.values, order.skip_token_values(&row));
    }

    #[test]
    fn null_marks_a_null_sort_key() {
        let ty = order_type();
        let cache = MetadataCache::new();
        let order = parse_orderby(Some("ShipName"), &ty, true, &cache)
            .expect("parse")
            .expect("some");
        let token = parse_skip_token("null,3", &order).expect("token");
        assert_eq!(token.values, vec![None, Some(Value::Int32(3))]);
    }
}
