//! Target resolution through the full processor.

mod common;

use common::{northwind, ALFKI};
use odata_core::{ODataError, ServiceConfig, Value};
use odata_uri::{RawQuery, TargetKind, TargetSource};

#[test]
fn service_document_and_specials_skip_execution() {
    let service = northwind(ServiceConfig::new());

    let desc = service.process("/", &RawQuery::new()).expect("process");
    assert_eq!(desc.target_kind(), TargetKind::ServiceDirectory);
    assert!(!desc.needs_execution());

    let desc = service.process("/$metadata", &RawQuery::new()).expect("process");
    assert_eq!(desc.target_kind(), TargetKind::Metadata);
    assert!(!desc.needs_execution());

    let desc = service.process("/$batch", &RawQuery::new()).expect("process");
    assert_eq!(desc.target_kind(), TargetKind::Batch);
    assert!(!desc.needs_execution());
}

#[test]
fn entity_and_property_targets() {
    let service = northwind(ServiceConfig::new());

    let desc = service.process("/Orders(10248)", &RawQuery::new()).expect("process");
    assert_eq!(desc.target_kind(), TargetKind::Resource);
    assert_eq!(desc.target_source(), TargetSource::EntitySet);
    assert!(desc.is_single_result());
    assert!(desc.needs_execution());
    let key = desc.last_segment().key.as_ref().expect("key");
    assert_eq!(key.get("OrderID"), Some(&Value::Int32(10_248)));

    let desc = service
        .process("/Orders(10248)/ShipName", &RawQuery::new())
        .expect("process");
    assert_eq!(desc.target_kind(), TargetKind::Primitive);
    assert_eq!(desc.target_source(), TargetSource::Property);

    let desc = service
        .process("/Orders(10248)/ShipName/$value", &RawQuery::new())
        .expect("process");
    assert_eq!(desc.target_kind(), TargetKind::PrimitiveValue);

    let desc = service
        .process(&format!("/{ALFKI}/Address/City"), &RawQuery::new())
        .expect("process");
    assert_eq!(desc.target_kind(), TargetKind::Primitive);
    assert_eq!(desc.segments().len(), 3);
}

#[test]
fn media_and_bag_targets() {
    let service = northwind(ServiceConfig::new());

    let desc = service
        .process("/Photos(1)/$value", &RawQuery::new())
        .expect("process");
    assert_eq!(desc.target_kind(), TargetKind::MediaResource);

    let desc = service
        .process_versioned(&format!("/{ALFKI}/Tags"), &RawQuery::new(), None, None)
        .expect("process");
    assert_eq!(desc.target_kind(), TargetKind::Bag);
}

#[test]
fn links_uris_are_flagged() {
    let service = northwind(ServiceConfig::new());
    let desc = service
        .process(&format!("/{ALFKI}/$links/Orders"), &RawQuery::new())
        .expect("process");
    assert!(desc.is_link_uri());
    assert_eq!(desc.target_kind(), TargetKind::Link);
    assert!(!desc.is_single_result());
    assert_eq!(
        desc.target_resource_set().map(|s| s.name.as_str()),
        Some("Orders")
    );
}

#[test]
fn unknown_targets_are_not_found() {
    let service = northwind(ServiceConfig::new());
    let err = service.process("/Unknown", &RawQuery::new()).unwrap_err();
    assert!(matches!(err, ODataError::ResourceNotFound(_)));
    assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);

    let err = service
        .process("/Orders(1)/Nothing", &RawQuery::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Type 'Order' does not have a property named 'Nothing'"
    );
}

#[test]
fn query_options_on_specials_are_ignored() {
    let service = northwind(ServiceConfig::new());
    let desc = service
        .process("/$metadata", &RawQuery::new().with_top("5"))
        .expect("process");
    assert_eq!(desc.top_count(), None);
    assert!(desc.filter_info().is_none());
}
