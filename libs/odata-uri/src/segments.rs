//! Resource-path parsing: turns `/Customers('ALFKI')/Orders/$count` into
//! typed segment descriptors.
//!
//! The path grammar is a short state machine: the first segment is a
//! service special (`$metadata`, `$batch`) or a resource set, every later
//! segment refines its predecessor, and a handful of segments
//! (`$value`, `$count`, bags, media resources) are strictly terminal.

use std::sync::Arc;

use odata_core::{
    MetadataProvider, ODataError, ODataResult, ResourceProperty, ResourcePropertyKind,
    ResourceSet, ResourceType, ResourceTypeKind, Value,
};

use crate::text::{find_outside_quotes, split_outside_quotes};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    /// No target; the empty path (service document).
    ServiceDirectory,
    Metadata,
    Batch,
    /// An entity or a set of entities.
    Resource,
    ComplexObject,
    Primitive,
    /// The raw `$value` of a primitive, or the `$count` scalar.
    PrimitiveValue,
    Bag,
    /// A `$links` segment or the navigation that follows one.
    Link,
    MediaResource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSource {
    None,
    EntitySet,
    Property,
}

/// Key predicate attached to a segment, values in key declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyPredicate {
    pub values: Vec<(String, Value)>,
}

impl KeyPredicate {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

#[derive(Clone, Debug)]
pub struct SegmentDescriptor {
    pub identifier: String,
    pub target_kind: TargetKind,
    pub target_source: TargetSource,
    /// Element type for sets, addressed type otherwise.
    pub resource_type: Option<Arc<ResourceType>>,
    pub resource_set: Option<Arc<ResourceSet>>,
    pub key: Option<KeyPredicate>,
    pub single_result: bool,
    /// The property this segment addresses, when it addresses one.
    pub property: Option<Arc<ResourceProperty>>,
}

impl SegmentDescriptor {
    fn special(identifier: &str, kind: TargetKind) -> Self {
        Self {
            identifier: identifier.to_owned(),
            target_kind: kind,
            target_source: TargetSource::None,
            resource_type: None,
            resource_set: None,
            key: None,
            single_result: false,
            property: None,
        }
    }
}

/// Parse a resource path (everything between the service root and the
/// query string) into segment descriptors.
///
/// # Errors
/// `ResourceNotFound` for unknown sets and properties, `Syntax` for
/// grammar violations (malformed keys, segments after a terminal, and
/// the like).
pub fn parse_path(
    path: &str,
    metadata: &dyn MetadataProvider,
) -> ODataResult<Vec<SegmentDescriptor>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(vec![SegmentDescriptor::special(
            "",
            TargetKind::ServiceDirectory,
        )]);
    }

    let mut segments: Vec<SegmentDescriptor> = Vec::new();
    let mut terminal = false;
    let mut after_links = false;

    for raw in split_outside_quotes(trimmed, '/') {
        if raw.is_empty() {
            return Err(ODataError::syntax(format!(
                "The request URI '{path}' contains an empty segment"
            )));
        }
        if terminal {
            let last = segments
                .last()
                .map_or(String::new(), |s| s.identifier.clone());
            return Err(ODataError::syntax(format!(
                "The request URI is not valid; the segment '{last}' must be the last segment in the URI"
            )));
        }

        let (name, key_expr) = split_segment(raw)?;

        if name.starts_with('$') && key_expr.is_some() {
            return Err(ODataError::syntax(format!(
                "Syntax error in the request URI segment '{raw}'"
            )));
        }

        match segments.last().cloned() {
            None => match name {
                "$metadata" => {
                    segments.push(SegmentDescriptor::special(name, TargetKind::Metadata));
                    terminal = true;
                }
                "$batch" => {
                    segments.push(SegmentDescriptor::special(name, TargetKind::Batch));
                    terminal = true;
                }
                _ if name.starts_with('$') => {
                    return Err(ODataError::syntax(format!(
                        "The request URI is not valid; '{name}' cannot be the first segment"
                    )));
                }
                _ => {
                    let set = metadata.resolve_resource_set(name).ok_or_else(|| {
                        ODataError::not_found(format!(
                            "Resource not found for the segment '{name}'"
                        ))
                    })?;
                    let element_type = Arc::clone(&set.element_type);
                    let key = match key_expr {
                        Some(expr) => Some(parse_key_predicate(expr, &element_type)?),
                        None => None,
                    };
                    segments.push(SegmentDescriptor {
                        identifier: name.to_owned(),
                        target_kind: TargetKind::Resource,
                        target_source: TargetSource::EntitySet,
                        resource_type: Some(element_type),
                        resource_set: Some(set),
                        single_result: key.is_some(),
                        key,
                        property: None,
                    });
                }
            },
            Some(prev) => {
                if after_links {
                    segments.push(link_navigation_segment(
                        &prev, name, key_expr, metadata, path,
                    )?);
                    after_links = false;
                    terminal = true;
                    continue;
                }
                match name {
                    "$value" => {
                        segments.push(value_segment(&prev, path)?);
                        terminal = true;
                    }
                    "$count" => {
                        if prev.target_kind != TargetKind::Resource || prev.single_result {
                            return Err(ODataError::syntax(format!(
                                "The request URI is not valid; $count cannot be applied to the segment '{}'",
                                prev.identifier
                            )));
                        }
                        segments.push(SegmentDescriptor {
                            identifier: name.to_owned(),
                            target_kind: TargetKind::PrimitiveValue,
                            target_source: prev.target_source,
                            resource_type: prev.resource_type.clone(),
                            resource_set: prev.resource_set.clone(),
                            key: None,
                            single_result: false,
                            property: None,
                        });
                        terminal = true;
                    }
                    "$links" => {
                        if prev.target_kind != TargetKind::Resource || !prev.single_result {
                            return Err(ODataError::syntax(
                                "The request URI is not valid; $links must follow a single entity",
                            ));
                        }
                        segments.push(SegmentDescriptor {
                            identifier: name.to_owned(),
                            target_kind: TargetKind::Link,
                            target_source: prev.target_source,
                            resource_type: prev.resource_type.clone(),
                            resource_set: prev.resource_set.clone(),
                            key: None,
                            single_result: true,
                            property: None,
                        });
                        after_links = true;
                    }
                    _ if name.starts_with('$') => {
                        return Err(ODataError::syntax(format!(
                            "Unknown system segment '{name}' in the request URI"
                        )));
                    }
                    _ => {
                        segments.push(property_segment(
                            &prev, name, key_expr, metadata, &mut terminal,
                        )?);
                    }
                }
            }
        }
    }

    if after_links {
        return Err(ODataError::syntax(
            "The request URI is not valid; $links must be followed by a navigation property",
        ));
    }
    Ok(segments)
}

fn value_segment(prev: &SegmentDescriptor, path: &str) -> ODataResult<SegmentDescriptor> {
    if prev.target_kind == TargetKind::Primitive {
        return Ok(SegmentDescriptor {
            identifier: "$value".to_owned(),
            target_kind: TargetKind::PrimitiveValue,
            target_source: TargetSource::Property,
            resource_type: prev.resource_type.clone(),
            resource_set: None,
            key: None,
            single_result: true,
            property: prev.property.clone(),
        });
    }
    if prev.target_kind == TargetKind::Resource
        && prev.single_result
        && prev
            .resource_type
            .as_ref()
            .is_some_and(|t| t.is_media_link_entry)
    {
        return Ok(SegmentDescriptor {
            identifier: "$value".to_owned(),
            target_kind: TargetKind::MediaResource,
            target_source: TargetSource::Property,
            resource_type: prev.resource_type.clone(),
            resource_set: None,
            key: None,
            single_result: true,
            property: None,
        });
    }
    Err(ODataError::syntax(format!(
        "The request URI '{path}' is not valid; $value cannot be applied to the segment '{}'",
        prev.identifier
    )))
}

fn link_navigation_segment(
    prev: &SegmentDescriptor,
    name: &str,
    key_expr: Option<&str>,
    metadata: &dyn MetadataProvider,
    path: &str,
) -> ODataResult<SegmentDescriptor> {
    let owner = prev.resource_type.as_ref().ok_or_else(|| {
        ODataError::syntax(format!("The request URI '{path}' is not valid"))
    })?;
    let property = owner.property(name).cloned().ok_or_else(|| {
        ODataError::not_found(format!(
            "Type '{}' does not have a property named '{name}'",
            owner.name
        ))
    })?;
    if !property.kind.is_navigation() {
        return Err(ODataError::syntax(format!(
            "The segment '{name}' is not valid; only navigation properties may follow $links"
        )));
    }
    let target_type = property.target_type.clone().ok_or_else(|| {
        ODataError::syntax(format!("The request URI '{path}' is not valid"))
    })?;
    let container = prev
        .resource_set
        .as_ref()
        .and_then(|set| metadata.container_for_navigation(set, &property));
    let key = match key_expr {
        Some(expr) => Some(parse_key_predicate(expr, &target_type)?),
        None => None,
    };
    let single_result =
        property.kind == ResourcePropertyKind::ResourceReference || key.is_some();
    Ok(SegmentDescriptor {
        identifier: name.to_owned(),
        target_kind: TargetKind::Link,
        target_source: TargetSource::Property,
        resource_type: Some(target_type),
        resource_set: container,
        key,
        single_result,
        property: Some(property),
    })
}

fn property_segment(
    prev: &SegmentDescriptor,
    name: &str,
    key_expr: Option<&str>,
    metadata: &dyn MetadataProvider,
    terminal: &mut bool,
) -> ODataResult<SegmentDescriptor> {
    if !matches!(
        prev.target_kind,
        TargetKind::Resource | TargetKind::ComplexObject
    ) {
        return Err(ODataError::syntax(format!(
            "The segment '{name}' cannot follow the segment '{}'",
            prev.identifier
        )));
    }
    if !prev.single_result {
        return Err(ODataError::syntax(format!(
            "The segment '{}' refers to a collection; a key predicate is required before addressing its properties",
            prev.identifier
        )));
    }
    let owner = prev.resource_type.as_ref().ok_or_else(|| {
        ODataError::syntax(format!("The segment '{name}' is not addressable"))
    })?;
    let property = owner.property(name).cloned().ok_or_else(|| {
        ODataError::not_found(format!(
            "Type '{}' does not have a property named '{name}'",
            owner.name
        ))
    })?;

    let reject_key = |allowed: bool| -> ODataResult<()> {
        if key_expr.is_some() && !allowed {
            Err(ODataError::syntax(format!(
                "The segment '{name}' cannot take a key predicate"
            )))
        } else {
            Ok(())
        }
    };

    match property.kind {
        ResourcePropertyKind::Primitive(kind) => {
            reject_key(false)?;
            Ok(SegmentDescriptor {
                identifier: name.to_owned(),
                target_kind: TargetKind::Primitive,
                target_source: TargetSource::Property,
                resource_type: Some(Arc::new(ResourceType::primitive(kind))),
                resource_set: None,
                key: None,
                single_result: true,
                property: Some(property),
            })
        }
        ResourcePropertyKind::ComplexType => {
            reject_key(false)?;
            Ok(SegmentDescriptor {
                identifier: name.to_owned(),
                target_kind: TargetKind::ComplexObject,
                target_source: TargetSource::Property,
                resource_type: property.target_type.clone(),
                resource_set: None,
                key: None,
                single_result: true,
                property: Some(property),
            })
        }
        ResourcePropertyKind::PrimitiveBag(_) | ResourcePropertyKind::ComplexBag => {
            reject_key(false)?;
            *terminal = true;
            Ok(SegmentDescriptor {
                identifier: name.to_owned(),
                target_kind: TargetKind::Bag,
                target_source: TargetSource::Property,
                resource_type: property.target_type.clone(),
                resource_set: None,
                key: None,
                single_result: true,
                property: Some(property),
            })
        }
        ResourcePropertyKind::ResourceReference => {
            reject_key(false)?;
            let container = prev
                .resource_set
                .as_ref()
                .and_then(|set| metadata.container_for_navigation(set, &property));
            Ok(SegmentDescriptor {
                identifier: name.to_owned(),
                target_kind: TargetKind::Resource,
                target_source: TargetSource::Property,
                resource_type: property.target_type.clone(),
                resource_set: container,
                key: None,
                single_result: true,
                property: Some(property),
            })
        }
        ResourcePropertyKind::ResourceSetReference => {
            let target_type = property.target_type.clone().ok_or_else(|| {
                ODataError::syntax(format!("The segment '{name}' is not addressable"))
            })?;
            let key = match key_expr {
                Some(expr) => Some(parse_key_predicate(expr, &target_type)?),
                None => None,
            };
            let container = prev
                .resource_set
                .as_ref()
                .and_then(|set| metadata.container_for_navigation(set, &property));
            Ok(SegmentDescriptor {
                identifier: name.to_owned(),
                target_kind: TargetKind::Resource,
                target_source: TargetSource::Property,
                resource_type: Some(target_type),
                resource_set: container,
                single_result: key.is_some(),
                key,
                property: Some(property),
            })
        }
    }
}

/// Split `Customers('ALFKI')` into the segment name and the raw key
/// expression between the parentheses.
fn split_segment(raw: &str) -> ODataResult<(&str, Option<&str>)> {
    match find_outside_quotes(raw, '(') {
        None => Ok((raw, None)),
        Some(open) => {
            let inner = raw[open..]
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .ok_or_else(|| {
                    ODataError::syntax(format!(
                        "Syntax error in the request URI segment '{raw}'"
                    ))
                })?;
            Ok((&raw[..open], Some(inner)))
        }
    }
}

/// Parse a key predicate, named (`CustomerID='ALFKI',CustomerGuid=guid'...'`)
/// or positional (single-key types only), into declaration order.
fn parse_key_predicate(expr: &str, ty: &ResourceType) -> ODataResult<KeyPredicate> {
    let keys = ty.key_properties();
    if keys.is_empty() || ty.kind != ResourceTypeKind::EntityType {
        return Err(ODataError::syntax(format!(
            "The type '{}' does not support key predicates",
            ty.name
        )));
    }
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(ODataError::syntax(format!(
            "The key predicate for type '{}' is empty",
            ty.name
        )));
    }

    let parts = split_outside_quotes(trimmed, ',');
    let named = find_outside_quotes(parts[0], '=').is_some();

    if !named {
        if parts.len() != 1 || keys.len() != 1 {
            return Err(ODataError::syntax(format!(
                "The key predicate '{trimmed}' does not match the key properties of type '{}'",
                ty.name
            )));
        }
        let kind = keys[0].kind.primitive_kind().ok_or_else(|| {
            ODataError::syntax(format!("The key of type '{}' is not primitive", ty.name))
        })?;
        let value = Value::parse_literal(kind, parts[0].trim())?;
        return Ok(KeyPredicate {
            values: vec![(keys[0].name.clone(), value)],
        });
    }

    let mut pairs: Vec<(String, Value)> = Vec::with_capacity(parts.len());
    for part in &parts {
        let eq = find_outside_quotes(part, '=').ok_or_else(|| {
            ODataError::syntax(format!("Syntax error in the key predicate '{trimmed}'"))
        })?;
        let name = part[..eq].trim();
        let literal = part[eq + 1..].trim();
        let key = keys.iter().find(|k| k.name == name).ok_or_else(|| {
            ODataError::syntax(format!(
                "The key predicate '{trimmed}' does not match the key properties of type '{}'",
                ty.name
            ))
        })?;
        if pairs.iter().any(|(n, _)| n == name) {
            return Err(ODataError::syntax(format!(
                "The key property '{name}' appears more than once in the key predicate"
            )));
        }
        let kind = key.kind.primitive_kind().ok_or_else(|| {
            ODataError::syntax(format!("The key of type '{}' is not primitive", ty.name))
        })?;
        pairs.push((name.to_owned(), Value::parse_literal(kind, literal)?));
    }
    if pairs.len() != keys.len() {
        return Err(ODataError::syntax(format!(
            "The key predicate '{trimmed}' does not match the key properties of type '{}'",
            ty.name
        )));
    }
    // Reorder into key declaration order.
    let mut values = Vec::with_capacity(keys.len());
    for key in &keys {
        if let Some(pair) = pairs.iter().find(|(n, _)| n == &key.name) {
            values.push(pair.clone());
        }
    }
    Ok(KeyPredicate { values })
}

#[cfg(test)]
#[path = "segments_tests.rs"]
mod tests;
