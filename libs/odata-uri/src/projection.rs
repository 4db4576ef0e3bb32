//! `$expand`/`$select` projection tree.
//!
//! Both options are comma-separated slash-paths over the target type and
//! merge into one tree rooted at the request target. Expanded nodes carry
//! the resource set they land in and, when that set is server-paged, the
//! implicit ordering a nested next-link needs.

use std::sync::Arc;

use odata_core::{
    MetadataCache, MetadataProvider, ODataError, ODataResult, ResourceProperty,
    ResourcePropertyKind, ResourceSet, ResourceType, ServiceConfig,
};

use crate::orderby::{parse_orderby, OrderByInfo};

/// A selected leaf property (primitive, complex, bag, or an unexpanded
/// navigation rendered as a deferred link).
#[derive(Clone, Debug)]
pub struct ProjectionNode {
    pub name: String,
    pub property: Arc<ResourceProperty>,
}

#[derive(Clone, Debug)]
pub enum ProjectionChild {
    Simple(ProjectionNode),
    Expanded(ExpandedProjectionNode),
}

impl ProjectionChild {
    fn name(&self) -> &str {
        match self {
            ProjectionChild::Simple(n) => &n.name,
            ProjectionChild::Expanded(n) => &n.name,
        }
    }
}

/// An expanded navigation (or the tree root).
#[derive(Clone, Debug)]
pub struct ExpandedProjectionNode {
    pub name: String,
    /// `None` at the root.
    pub property: Option<Arc<ResourceProperty>>,
    pub resource_type: Arc<ResourceType>,
    pub resource_set: Option<Arc<ResourceSet>>,
    /// All properties of this node are in the projection.
    pub select_all: bool,
    /// This node itself is in the projection.
    pub selected: bool,
    /// Implicit ordering for a server-paged expanded set.
    pub order_info: Option<OrderByInfo>,
    children: Vec<ProjectionChild>,
    wildcard: bool,
    explicit_select: bool,
}

impl ExpandedProjectionNode {
    fn new(
        name: String,
        property: Option<Arc<ResourceProperty>>,
        resource_type: Arc<ResourceType>,
        resource_set: Option<Arc<ResourceSet>>,
    ) -> Self {
        Self {
            name,
            property,
            resource_type,
            resource_set,
            select_all: true,
            selected: false,
            order_info: None,
            children: Vec::new(),
            wildcard: false,
            explicit_select: false,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[ProjectionChild] {
        &self.children
    }

    #[must_use]
    pub fn find_expanded(&self, name: &str) -> Option<&ExpandedProjectionNode> {
        self.children.iter().find_map(|c| match c {
            ProjectionChild::Expanded(n) if n.name == name => Some(n),
            _ => None,
        })
    }

    /// Index of the expanded child for `property`, creating it on demand.
    fn ensure_expanded(
        &mut self,
        property: &Arc<ResourceProperty>,
        metadata: &dyn MetadataProvider,
    ) -> ODataResult<usize> {
        if let Some(index) = self.children.iter().position(|c| {
            matches!(c, ProjectionChild::Expanded(_)) && c.name() == property.name
        }) {
            return Ok(index);
        }
        let target_type = property.target_type.clone().ok_or_else(|| {
            ODataError::syntax(format!(
                "The navigation property '{}' has no target type",
                property.name
            ))
        })?;
        let resource_set = self
            .resource_set
            .as_ref()
            .and_then(|set| metadata.container_for_navigation(set, property));
        self.children
            .push(ProjectionChild::Expanded(ExpandedProjectionNode::new(
                property.name.clone(),
                Some(Arc::clone(property)),
                target_type,
                resource_set,
            )));
        Ok(self.children.len() - 1)
    }

    fn ensure_simple(&mut self, property: &Arc<ResourceProperty>) {
        for child in &mut self.children {
            if child.name() == property.name {
                if let ProjectionChild::Expanded(node) = child {
                    node.selected = true;
                }
                return;
            }
        }
        self.children.push(ProjectionChild::Simple(ProjectionNode {
            name: property.name.clone(),
            property: Arc::clone(property),
        }));
    }

    fn finalize(&mut self) {
        self.select_all = self.wildcard || !self.explicit_select;
        for child in &mut self.children {
            if let ProjectionChild::Expanded(node) = child {
                if self.select_all {
                    node.selected = true;
                }
                node.finalize();
            }
        }
    }

    fn attach_paging(
        &mut self,
        config: &ServiceConfig,
        cache: &MetadataCache,
        paged: &mut bool,
    ) -> ODataResult<()> {
        for child in &mut self.children {
            if let ProjectionChild::Expanded(node) = child {
                let is_set = node
                    .property
                    .as_ref()
                    .is_some_and(|p| p.kind == ResourcePropertyKind::ResourceSetReference);
                let page = node
                    .resource_set
                    .as_ref()
                    .and_then(|set| config.page_size(&set.name));
                if is_set && page.is_some() {
                    node.order_info = parse_orderby(None, &node.resource_type, true, cache)?;
                    *paged = true;
                }
                node.attach_paging(config, cache, paged)?;
            }
        }
        Ok(())
    }
}

/// The root of the projection tree plus what the client actually spelled
/// out, which serializers need to distinguish `$select=*` from no
/// `$select` at all.
#[derive(Clone, Debug)]
pub struct RootProjectionNode {
    pub node: ExpandedProjectionNode,
    pub expansions_specified: bool,
    pub selection_specified: bool,
    /// Some expanded set in the tree is server-paged.
    pub has_paged_expansion: bool,
}

/// Build the projection tree for the request target. Returns `None` when
/// neither option is present.
///
/// # Errors
/// `ResourceNotFound` for unknown properties, `NotApplicable` when
/// `$select` is disabled by configuration, `Syntax` for malformed paths.
#[allow(clippy::too_many_arguments)]
pub fn parse_projections(
    expand: Option<&str>,
    select: Option<&str>,
    target_type: &Arc<ResourceType>,
    target_set: Option<&Arc<ResourceSet>>,
    metadata: &dyn MetadataProvider,
    config: &ServiceConfig,
    cache: &MetadataCache,
) -> ODataResult<Option<RootProjectionNode>> {
    if select.is_some() && !config.projections_enabled {
        return Err(ODataError::NotApplicable(
            "The $select query option is disabled for this data service".to_owned(),
        ));
    }
    if expand.is_none() && select.is_none() {
        return Ok(None);
    }

    let mut root = ExpandedProjectionNode::new(
        String::new(),
        None,
        Arc::clone(target_type),
        target_set.cloned(),
    );
    root.selected = true;

    if let Some(expand) = expand {
        for path in expand.split(',') {
            apply_expand_path(&mut root, path.trim(), metadata)?;
        }
    }
    if let Some(select) = select {
        for path in select.split(',') {
            apply_select_path(&mut root, path.trim())?;
        }
    }

    root.finalize();
    let mut has_paged_expansion = false;
    root.attach_paging(config, cache, &mut has_paged_expansion)?;

    Ok(Some(RootProjectionNode {
        node: root,
        expansions_specified: expand.is_some(),
        selection_specified: select.is_some(),
        has_paged_expansion,
    }))
}

fn apply_expand_path(
    root: &mut ExpandedProjectionNode,
    path: &str,
    metadata: &dyn MetadataProvider,
) -> ODataResult<()> {
    if path.is_empty() {
        return Err(ODataError::syntax(
            "The $expand query option contains an empty path",
        ));
    }
    let mut current = root;
    for step in path.split('/') {
        let property = current
            .resource_type
            .property(step)
            .cloned()
            .ok_or_else(|| {
                ODataError::not_found(format!(
                    "Type '{}' does not have a property named '{step}'",
                    current.resource_type.name
                ))
            })?;
        if !property.kind.is_navigation() {
            return Err(ODataError::syntax(format!(
                "The property '{step}' on type '{}' is not a navigation property and cannot be expanded",
                current.resource_type.name
            )));
        }
        let index = current.ensure_expanded(&property, metadata)?;
        current = match &mut current.children[index] {
            ProjectionChild::Expanded(node) => node,
            ProjectionChild::Simple(_) => unreachable!("ensure_expanded returns expanded nodes"),
        };
    }
    Ok(())
}

fn apply_select_path(root: &mut ExpandedProjectionNode, path: &str) -> ODataResult<()> {
    if path.is_empty() {
        return Err(ODataError::syntax(
            "The $select query option contains an empty path",
        ));
    }
    let mut current = root;
    let steps: Vec<&str> = path.split('/').collect();
    for (index, step) in steps.iter().enumerate() {
        let is_last = index + 1 == steps.len();
        current.explicit_select = true;

        if *step == "*" {
            if !is_last {
                return Err(ODataError::syntax(format!(
                    "The wildcard must be the last segment of the $select path '{path}'"
                )));
            }
            current.wildcard = true;
            return Ok(());
        }

        let property = current
            .resource_type
            .property(step)
            .cloned()
            .ok_or_else(|| {
                ODataError::not_found(format!(
                    "Type '{}' does not have a property named '{step}'",
                    current.resource_type.name
                ))
            })?;

        if is_last {
            current.ensure_simple(&property);
            return Ok(());
        }

        if !property.kind.is_navigation() {
            return Err(ODataError::syntax(format!(
                "The property '{step}' on type '{}' is not a navigation property; it can only be the last segment of a $select path",
                current.resource_type.name
            )));
        }
        let Some(node) = find_expanded_index(current, step) else {
            return Err(ODataError::syntax(format!(
                "The navigation property '{step}' must be expanded with $expand before $select can traverse it"
            )));
        };
        current = match &mut current.children[node] {
            ProjectionChild::Expanded(node) => {
                node.selected = true;
                node
            }
            ProjectionChild::Simple(_) => unreachable!("index points at an expanded child"),
        };
    }
    Ok(())
}

fn find_expanded_index(node: &ExpandedProjectionNode, name: &str) -> Option<usize> {
    node.children
        .iter()
        .position(|c| matches!(c, ProjectionChild::Expanded(n) if n.name == name))
}

#[cfg(test)]
#[path = "projection_tests.rs"]
mod tests;
