//! Read-only metadata model: resource types, properties and sets.
//!
//! The URI compiler never mutates metadata; providers must behave as
//! immutable for the duration of a request.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::PrimitiveKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceTypeKind {
    EntityType,
    ComplexType,
    Primitive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourcePropertyKind {
    Primitive(PrimitiveKind),
    ComplexType,
    /// Navigation with singular cardinality.
    ResourceReference,
    /// Navigation with plural cardinality.
    ResourceSetReference,
    PrimitiveBag(PrimitiveKind),
    ComplexBag,
}

impl ResourcePropertyKind {
    #[must_use]
    pub fn is_navigation(self) -> bool {
        matches!(
            self,
            ResourcePropertyKind::ResourceReference | ResourcePropertyKind::ResourceSetReference
        )
    }

    #[must_use]
    pub fn is_bag(self) -> bool {
        matches!(
            self,
            ResourcePropertyKind::PrimitiveBag(_) | ResourcePropertyKind::ComplexBag
        )
    }

    #[must_use]
    pub fn primitive_kind(self) -> Option<PrimitiveKind> {
        match self {
            ResourcePropertyKind::Primitive(k) | ResourcePropertyKind::PrimitiveBag(k) => Some(k),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResourceProperty {
    pub name: String,
    pub kind: ResourcePropertyKind,
    /// The complex or entity type this property points at; `None` for
    /// primitives and primitive bags.
    pub target_type: Option<Arc<ResourceType>>,
    pub is_key: bool,
    pub is_etag: bool,
}

#[derive(Clone, Debug)]
pub struct ResourceType {
    pub name: String,
    pub kind: ResourceTypeKind,
    /// Set when `kind == Primitive`.
    pub primitive: Option<PrimitiveKind>,
    /// Declaration order is significant: key properties keep it.
    pub properties: Vec<Arc<ResourceProperty>>,
    pub is_media_link_entry: bool,
    pub named_streams: Vec<String>,
}

impl ResourceType {
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceTypeKind::EntityType,
            primitive: None,
            properties: Vec::new(),
            is_media_link_entry: false,
            named_streams: Vec::new(),
        }
    }

    pub fn complex(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ResourceTypeKind::ComplexType,
            primitive: None,
            properties: Vec::new(),
            is_media_link_entry: false,
            named_streams: Vec::new(),
        }
    }

    #[must_use]
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            name: kind.edm_name().to_owned(),
            kind: ResourceTypeKind::Primitive,
            primitive: Some(kind),
            properties: Vec::new(),
            is_media_link_entry: false,
            named_streams: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_key(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.push(ResourceProperty {
            name: name.into(),
            kind: ResourcePropertyKind::Primitive(kind),
            target_type: None,
            is_key: true,
            is_etag: false,
        })
    }

    #[must_use]
    pub fn with_primitive(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.push(ResourceProperty {
            name: name.into(),
            kind: ResourcePropertyKind::Primitive(kind),
            target_type: None,
            is_key: false,
            is_etag: false,
        })
    }

    #[must_use]
    pub fn with_etag(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.push(ResourceProperty {
            name: name.into(),
            kind: ResourcePropertyKind::Primitive(kind),
            target_type: None,
            is_key: false,
            is_etag: true,
        })
    }

    #[must_use]
    pub fn with_complex(self, name: impl Into<String>, ty: Arc<ResourceType>) -> Self {
        self.push(ResourceProperty {
            name: name.into(),
            kind: ResourcePropertyKind::ComplexType,
            target_type: Some(ty),
            is_key: false,
            is_etag: false,
        })
    }

    #[must_use]
    pub fn with_reference(self, name: impl Into<String>, ty: Arc<ResourceType>) -> Self {
        self.push(ResourceProperty {
            name: name.into(),
            kind: ResourcePropertyKind::ResourceReference,
            target_type: Some(ty),
            is_key: false,
            is_etag: false,
        })
    }

    #[must_use]
    pub fn with_set_reference(self, name: impl Into<String>, ty: Arc<ResourceType>) -> Self {
        self.push(ResourceProperty {
            name: name.into(),
            kind: ResourcePropertyKind::ResourceSetReference,
            target_type: Some(ty),
            is_key: false,
            is_etag: false,
        })
    }

    #[must_use]
    pub fn with_primitive_bag(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.push(ResourceProperty {
            name: name.into(),
            kind: ResourcePropertyKind::PrimitiveBag(kind),
            target_type: None,
            is_key: false,
            is_etag: false,
        })
    }

    #[must_use]
    pub fn with_complex_bag(self, name: impl Into<String>, ty: Arc<ResourceType>) -> Self {
        self.push(ResourceProperty {
            name: name.into(),
            kind: ResourcePropertyKind::ComplexBag,
            target_type: Some(ty),
            is_key: false,
            is_etag: false,
        })
    }

    #[must_use]
    pub fn as_media_link_entry(mut self) -> Self {
        self.is_media_link_entry = true;
        self
    }

    fn push(mut self, property: ResourceProperty) -> Self {
        self.properties.push(Arc::new(property));
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Arc<ResourceProperty>> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Key properties in declaration order.
    #[must_use]
    pub fn key_properties(&self) -> Vec<Arc<ResourceProperty>> {
        self.properties.iter().filter(|p| p.is_key).cloned().collect()
    }

    #[must_use]
    pub fn etag_properties(&self) -> Vec<Arc<ResourceProperty>> {
        self.properties.iter().filter(|p| p.is_etag).cloned().collect()
    }
}

#[derive(Clone, Debug)]
pub struct ResourceSet {
    pub name: String,
    pub element_type: Arc<ResourceType>,
}

impl ResourceSet {
    pub fn new(name: impl Into<String>, element_type: Arc<ResourceType>) -> Self {
        Self {
            name: name.into(),
            element_type,
        }
    }
}

/// The metadata collaborator consumed by the URI compiler.
pub trait MetadataProvider: Send + Sync {
    fn resolve_resource_set(&self, name: &str) -> Option<Arc<ResourceSet>>;

    fn resolve_resource_type(&self, name: &str) -> Option<Arc<ResourceType>>;

    /// Resolve the resource set a navigation property lands in when
    /// followed from `source`.
    fn container_for_navigation(
        &self,
        source: &ResourceSet,
        navigation: &ResourceProperty,
    ) -> Option<Arc<ResourceSet>>;
}

/// Straightforward map-backed provider. Navigation containers default to
/// the unique registered set whose element type matches the navigation
/// target; ambiguous pairs can be pinned with [`InMemoryMetadata::with_container`].
#[derive(Default)]
pub struct InMemoryMetadata {
    sets: HashMap<String, Arc<ResourceSet>>,
    types: HashMap<String, Arc<ResourceType>>,
    containers: HashMap<(String, String), String>,
}

impl InMemoryMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type(mut self, ty: Arc<ResourceType>) -> Self {
        self.types.insert(ty.name.clone(), ty);
        self
    }

    #[must_use]
    pub fn with_set(mut self, set: ResourceSet) -> Self {
        let set = Arc::new(set);
        self.types
            .insert(set.element_type.name.clone(), Arc::clone(&set.element_type));
        self.sets.insert(set.name.clone(), set);
        self
    }

    #[must_use]
    pub fn with_container(
        mut self,
        source_set: impl Into<String>,
        navigation: impl Into<String>,
        target_set: impl Into<String>,
    ) -> Self {
        self.containers
            .insert((source_set.into(), navigation.into()), target_set.into());
        self
    }
}

impl MetadataProvider for InMemoryMetadata {
    fn resolve_resource_set(&self, name: &str) -> Option<Arc<ResourceSet>> {
        self.sets.get(name).cloned()
    }

    fn resolve_resource_type(&self, name: &str) -> Option<Arc<ResourceType>> {
        self.types.get(name).cloned()
    }

    fn container_for_navigation(
        &self,
        source: &ResourceSet,
        navigation: &ResourceProperty,
    ) -> Option<Arc<ResourceSet>> {
        if let Some(pinned) = self
            .containers
            .get(&(source.name.clone(), navigation.name.clone()))
        {
            return self.sets.get(pinned).cloned();
        }
        let target = navigation.target_type.as_ref()?;
        let mut found = None;
        for set in self.sets.values() {
            if set.element_type.name == target.name {
                if found.is_some() {
                    return None; // ambiguous without a pinned container
                }
                found = Some(Arc::clone(set));
            }
        }
        found
    }
}

/// Request-safe memo of ordered key-property lists, keyed by type name.
///
/// Owned by whoever owns the metadata provider and handed by reference into
/// the parsing components; `reset` ties its lifecycle to metadata reloads.
#[derive(Default)]
pub struct MetadataCache {
    keys: RwLock<HashMap<String, Arc<Vec<Arc<ResourceProperty>>>>>,
}

impl MetadataCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_properties(&self, ty: &ResourceType) -> Arc<Vec<Arc<ResourceProperty>>> {
        if let Some(hit) = self.keys.read().get(&ty.name) {
            return Arc::clone(hit);
        }
        let computed = Arc::new(ty.key_properties());
        self.keys
            .write()
            .entry(ty.name.clone())
            .or_insert_with(|| Arc::clone(&computed))
            .clone()
    }

    pub fn reset(&self) {
        self.keys.write().clear();
    }
}
