use std::sync::Arc;

use odata_core::{
    InMemoryMetadata, MetadataCache, MetadataProvider, ODataError, PrimitiveKind, ResourceSet,
    ResourceType, ServiceConfig,
};

use crate::projection::{parse_projections, ProjectionChild};

struct Fixture {
    metadata: InMemoryMetadata,
    config: ServiceConfig,
    cache: MetadataCache,
}

fn fixture(config: ServiceConfig) -> Fixture {
    let detail = Arc::new(
        ResourceType::entity("OrderDetail")
            .with_key("DetailID", PrimitiveKind::Int32)
            .with_primitive("Quantity", PrimitiveKind::Int16),
    );
    let order = Arc::new(
        ResourceType::entity("Order")
            .with_key("OrderID", PrimitiveKind::Int32)
            .with_primitive("ShipName", PrimitiveKind::String)
            .with_set_reference("Details", Arc::clone(&detail)),
    );
    let customer = Arc::new(
        ResourceType::entity("Customer")
            .with_key("CustomerID", PrimitiveKind::String)
            .with_primitive("CompanyName", PrimitiveKind::String)
            .with_primitive("Phone", PrimitiveKind::String)
            .with_set_reference("Orders", Arc::clone(&order)),
    );
    let metadata = InMemoryMetadata::new()
        .with_set(ResourceSet::new("Customers", customer))
        .with_set(ResourceSet::new("Orders", order))
        .with_set(ResourceSet::new("OrderDetails", detail));
    Fixture {
        metadata,
        config,
        cache: MetadataCache::new(),
    }
}

fn build(
    f: &Fixture,
    expand: Option<&str>,
    select: Option<&str>,
) -> odata_core::ODataResult<Option<crate::projection::RootProjectionNode>> {
    let set = f.metadata.resolve_resource_set("Customers").expect("set");
    let ty = Arc::clone(&set.element_type);
    parse_projections(
        expand,
        select,
        &ty,
        Some(&set),
        &f.metadata,
        &f.config,
        &f.cache,
    )
}

#[test]
fn absent_options_build_nothing() {
    let f = fixture(ServiceConfig::new());
    assert!(build(&f, None, None).expect("ok").is_none());
}

#[test]
fn expand_builds_nested_nodes() {
    let f = fixture(ServiceConfig::new());
    let root = build(&f, Some("Orders/Details"), None)
        .expect("ok")
        .expect("root");
    assert!(root.expansions_specified);
    assert!(!root.selection_specified);

    let orders = root.node.find_expanded("Orders").expect("orders node");
    assert_eq!(
        orders.resource_set.as_ref().map(|s| s.name.as_str()),
        Some("Orders")
    );
    assert!(orders.selected);
    assert!(orders.select_all);
    let details = orders.find_expanded("Details").expect("details node");
    assert!(details.selected);
}

#[test]
fn duplicate_expand_paths_merge() {
    let f = fixture(ServiceConfig::new());
    let root = build(&f, Some("Orders,Orders/Details,Orders"), None)
        .expect("ok")
        .expect("root");
    let expanded: Vec<&str> = root
        .node
        .children()
        .iter()
        .map(|c| match c {
            ProjectionChild::Expanded(n) => n.name.as_str(),
            ProjectionChild::Simple(n) => n.name.as_str(),
        })
        .collect();
    assert_eq!(expanded, vec!["Orders"]);
}

#[test]
fn select_restricts_the_root() {
    let f = fixture(ServiceConfig::new());
    let root = build(&f, Some("Orders"), Some("CompanyName,Orders"))
        .expect("ok")
        .expect("root");
    assert!(root.selection_specified);
    assert!(!root.node.select_all);

    let names: Vec<&str> = root
        .node
        .children()
        .iter()
        .map(|c| match c {
            ProjectionChild::Expanded(n) => n.name.as_str(),
            ProjectionChild::Simple(n) => n.name.as_str(),
        })
        .collect();
    assert_eq!(names, vec!["Orders", "CompanyName"]);

    // The expanded node is selected whole, so it keeps select_all.
    let orders = root.node.find_expanded("Orders").expect("orders");
    assert!(orders.selected);
    assert!(orders.select_all);
}

#[test]
fn unselected_expansion_is_not_projected() {
    let f = fixture(ServiceConfig::new());
    let root = build(&f, Some("Orders"), Some("CompanyName"))
        .expect("ok")
        .expect("root");
    let orders = root.node.find_expanded("Orders").expect("orders");
    assert!(!orders.selected);
}

#[test]
fn wildcard_keeps_select_all() {
    let f = fixture(ServiceConfig::new());
    let root = build(&f, Some("Orders"), Some("*"))
        .expect("ok")
        .expect("root");
    assert!(root.node.select_all);
    assert!(root.node.find_expanded("Orders").is_some_and(|n| n.selected));

    assert!(build(&f, None, Some("*/CompanyName")).is_err());
}

#[test]
fn select_into_an_expansion_restricts_it() {
    let f = fixture(ServiceConfig::new());
    let root = build(&f, Some("Orders"), Some("Orders/ShipName"))
        .expect("ok")
        .expect("root");
    let orders = root.node.find_expanded("Orders").expect("orders");
    assert!(orders.selected);
    assert!(!orders.select_all);
    assert_eq!(orders.children().len(), 1);
}

#[test]
fn select_through_unexpanded_navigation_fails() {
    let f = fixture(ServiceConfig::new());
    let err = build(&f, None, Some("Orders/ShipName")).unwrap_err();
    assert!(err.to_string().contains("must be expanded with $expand"));
}

#[test]
fn non_navigation_cannot_be_expanded_or_traversed() {
    let f = fixture(ServiceConfig::new());
    assert!(build(&f, Some("CompanyName"), None).is_err());
    assert!(build(&f, Some("Orders"), Some("Phone/CompanyName")).is_err());
    assert!(matches!(
        build(&f, Some("Missing"), None).unwrap_err(),
        ODataError::ResourceNotFound(_)
    ));
    assert!(matches!(
        build(&f, None, Some("Missing")).unwrap_err(),
        ODataError::ResourceNotFound(_)
    ));
}

#[test]
fn disabled_projections_reject_select_but_not_expand() {
    let f = fixture(ServiceConfig::new().with_projections_enabled(false));
    assert!(build(&f, Some("Orders"), None).is_ok());
    let err = build(&f, None, Some("CompanyName")).unwrap_err();
    assert!(matches!(err, ODataError::NotApplicable(_)));
}

#[test]
fn paged_expansion_gets_implicit_ordering() {
    let f = fixture(ServiceConfig::new().with_page_size("Orders", 5));
    let root = build(&f, Some("Orders/Details"), None)
        .expect("ok")
        .expect("root");
    assert!(root.has_paged_expansion);

    let orders = root.node.find_expanded("Orders").expect("orders");
    let order_info = orders.order_info.as_ref().expect("order info");
    assert_eq!(order_info.segments().len(), 1);
    assert_eq!(order_info.segments()[0].sub_segments[0].name, "OrderID");

    // Details is not paged, so it carries no ordering.
    let details = orders.find_expanded("Details").expect("details");
    assert!(details.order_info.is_none());
}

#[test]
fn unpaged_expansion_has_no_ordering() {
    let f = fixture(ServiceConfig::new());
    let root = build(&f, Some("Orders"), None).expect("ok").expect("root");
    assert!(!root.has_paged_expansion);
    assert!(root
        .node
        .find_expanded("Orders")
        .is_some_and(|n| n.order_info.is_none()));
}
