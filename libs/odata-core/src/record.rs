//! Row capability interface.
//!
//! Execution hands the compiled predicate and comparator row objects that
//! implement [`Record`]; property access is by name, resolved by the data
//! provider rather than by reflection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

#[derive(Clone)]
pub enum FieldValue {
    Null,
    Value(Value),
    /// A complex value or a single related entity.
    Record(Arc<dyn Record>),
    /// A set-valued navigation.
    Records(Vec<Arc<dyn Record>>),
    /// A bag of primitives.
    Values(Vec<Value>),
}

impl std::fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Null => f.write_str("Null"),
            FieldValue::Value(v) => write!(f, "Value({v:?})"),
            FieldValue::Record(_) => f.write_str("Record(..)"),
            FieldValue::Records(r) => write!(f, "Records(len={})", r.len()),
            FieldValue::Values(v) => write!(f, "Values({v:?})"),
        }
    }
}

pub trait Record: Send + Sync {
    /// Fetch a property value by name. Unknown names yield
    /// [`FieldValue::Null`]; the compiler has already validated every name
    /// it will ask for against metadata.
    fn field(&self, name: &str) -> FieldValue;
}

/// Map-backed [`Record`], used by tests and by providers that materialize
/// rows dynamically.
#[derive(Default, Clone, Debug)]
pub struct ValueMap {
    fields: HashMap<String, FieldValue>,
}

impl ValueMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(self, name: impl Into<String>, value: Value) -> Self {
        self.with_field(name, FieldValue::Value(value))
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn into_record(self) -> Arc<dyn Record> {
        Arc::new(self)
    }
}

impl Record for ValueMap {
    fn field(&self, name: &str) -> FieldValue {
        self.fields.get(name).cloned().unwrap_or(FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_null() {
        let row = ValueMap::new().with_value("Name", Value::String("x".into()));
        assert!(matches!(row.field("Name"), FieldValue::Value(_)));
        assert!(matches!(row.field("Other"), FieldValue::Null));
    }

    #[test]
    fn nested_records() {
        let address = ValueMap::new()
            .with_value("City", Value::String("Berlin".into()))
            .into_record();
        let row = ValueMap::new().with_field("Address", FieldValue::Record(address));
        match row.field("Address") {
            FieldValue::Record(r) => {
                assert!(matches!(r.field("City"), FieldValue::Value(Value::String(_))));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }
}
