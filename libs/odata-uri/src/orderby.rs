//! `$orderby` parsing and the compiled multi-key comparator.
//!
//! When server paging, `$top`, `$skip` or a `$skiptoken` make the result
//! order observable, the parser appends the target's key properties to
//! whatever the client asked for, so the full ordering is always total.

use std::cmp::Ordering;
use std::sync::Arc;

use odata_core::{
    FieldValue, MetadataCache, ODataError, ODataResult, PrimitiveKind, Record,
    ResourcePropertyKind, ResourceType, Value,
};

use crate::text::split_outside_quotes;

/// One step of an ordering path; intermediate steps are complex
/// properties, the final step is primitive.
#[derive(Clone, Debug)]
pub struct OrderBySubPathSegment {
    pub name: String,
    pub kind: ResourcePropertyKind,
}

#[derive(Clone, Debug)]
pub struct OrderByPathSegment {
    pub sub_segments: Vec<OrderBySubPathSegment>,
    pub ascending: bool,
}

impl OrderByPathSegment {
    /// The primitive kind the path resolves to.
    #[must_use]
    pub fn result_kind(&self) -> PrimitiveKind {
        self.sub_segments
            .last()
            .and_then(|s| s.kind.primitive_kind())
            .unwrap_or(PrimitiveKind::String)
    }

    fn eval(&self, row: &dyn Record) -> Option<Value> {
        let (last, init) = self.sub_segments.split_last()?;
        let mut owner: Option<Arc<dyn Record>> = None;
        for step in init {
            let field = match &owner {
                Some(record) => record.field(&step.name),
                None => row.field(&step.name),
            };
            match field {
                FieldValue::Record(record) => owner = Some(record),
                _ => return None,
            }
        }
        let field = match &owner {
            Some(record) => record.field(&last.name),
            None => row.field(&last.name),
        };
        match field {
            FieldValue::Value(value) => Some(value),
            _ => None,
        }
    }
}

pub type Comparator = Arc<dyn Fn(&dyn Record, &dyn Record) -> Ordering + Send + Sync>;

/// The resolved `$orderby`, explicit clauses first, implicit key clauses
/// appended when the ordering had to be made total.
#[derive(Clone, Debug)]
pub struct OrderByInfo {
    segments: Vec<OrderByPathSegment>,
}

impl OrderByInfo {
    #[must_use]
    pub fn segments(&self) -> &[OrderByPathSegment] {
        &self.segments
    }

    /// Compare two rows under the full ordering. Null sorts first on an
    /// ascending key, last on a descending one.
    #[must_use]
    pub fn compare(&self, left: &dyn Record, right: &dyn Record) -> Ordering {
        for segment in &self.segments {
            let l = segment.eval(left);
            let r = segment.eval(right);
            let ordering = match (l, r) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.compare(&b).unwrap_or(Ordering::Equal),
            };
            let ordering = if segment.ascending {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    #[must_use]
    pub fn comparator(&self) -> Comparator {
        let info = self.clone();
        Arc::new(move |left: &dyn Record, right: &dyn Record| info.compare(left, right))
    }

    /// Sort-key values for a row, in clause order. `None` marks a null key.
    #[must_use]
    pub fn skip_token_values(&self, row: &dyn Record) -> Vec<Option<Value>> {
        self.segments.iter().map(|s| s.eval(row)).collect()
    }

    /// Render the `$skiptoken` literal list that resumes after `row`.
    /// Round-trips through [`crate::skiptoken::parse_skip_token`].
    #[must_use]
    pub fn build_skip_token(&self, row: &dyn Record) -> String {
        self.skip_token_values(row)
            .iter()
            .map(|v| match v {
                Some(value) => value.to_literal(),
                None => "null".to_owned(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse `$orderby` against the target element type.
///
/// `paging_required` appends the key properties (ascending) that the
/// explicit clauses did not already name; a key is recognized only as a
/// bare single-segment clause. With no raw text and no paging this
/// returns `None`.
///
/// # Errors
/// `ResourceNotFound` for unknown properties, `Syntax` for everything
/// else (bad direction keyword, non-sortable property kinds).
pub fn parse_orderby(
    raw: Option<&str>,
    target: &Arc<ResourceType>,
    paging_required: bool,
    cache: &MetadataCache,
) -> ODataResult<Option<OrderByInfo>> {
    let mut segments = Vec::new();
    if let Some(raw) = raw {
        for clause in split_outside_quotes(raw, ',') {
            segments.push(parse_clause(clause, target)?);
        }
    }
    if raw.is_none() && !paging_required {
        return Ok(None);
    }
    if paging_required {
        for key in cache.key_properties(target).iter() {
            let already = segments.iter().any(|s: &OrderByPathSegment| {
                s.sub_segments.len() == 1 && s.sub_segments[0].name == key.name
            });
            if !already {
                segments.push(OrderByPathSegment {
                    sub_segments: vec![OrderBySubPathSegment {
                        name: key.name.clone(),
                        kind: key.kind,
                    }],
                    ascending: true,
                });
            }
        }
    }
    Ok(Some(OrderByInfo { segments }))
}

fn parse_clause(clause: &str, target: &Arc<ResourceType>) -> ODataResult<OrderByPathSegment> {
    let mut words = clause.split_whitespace();
    let path = words.next().ok_or_else(|| {
        ODataError::syntax("The $orderby query option contains an empty clause")
    })?;
    let ascending = match words.next() {
        None => true,
        Some("asc") => true,
        Some("desc") => false,
        Some(other) => {
            return Err(ODataError::syntax(format!(
                "Invalid sort direction '{other}' in the $orderby clause '{clause}'"
            )))
        }
    };
    if words.next().is_some() {
        return Err(ODataError::syntax(format!(
            "Invalid $orderby clause '{clause}'"
        )));
    }

    let mut sub_segments = Vec::new();
    let mut container = Arc::clone(target);
    let steps: Vec<&str> = path.split('/').collect();
    for (index, step) in steps.iter().enumerate() {
        let property = container.property(step).cloned().ok_or_else(|| {
            ODataError::not_found(format!(
                "Type '{}' does not have a property named '{step}'",
                container.name
            ))
        })?;
        let is_last = index + 1 == steps.len();
        match property.kind {
            ResourcePropertyKind::Primitive(_) if is_last => {}
            ResourcePropertyKind::Primitive(_) => {
                return Err(ODataError::syntax(format!(
                    "The primitive property '{step}' cannot be further composed in the $orderby clause '{clause}'"
                )))
            }
            ResourcePropertyKind::ComplexType if !is_last => {
                container = Arc::clone(property.target_type.as_ref().ok_or_else(|| {
                    ODataError::syntax(format!("Invalid $orderby clause '{clause}'"))
                })?);
            }
            _ => {
                return Err(ODataError::syntax(format!(
                    "The property '{step}' cannot be used in the $orderby clause '{clause}'; only primitive properties reached through complex properties are sortable"
                )))
            }
        }
        sub_segments.push(OrderBySubPathSegment {
            name: property.name.clone(),
            kind: property.kind,
        });
    }
    Ok(OrderByPathSegment {
        sub_segments,
        ascending,
    })
}

#[cfg(test)]
#[path = "orderby_tests.rs"]
mod tests;
