//! Northwind-flavored fixture shared by the integration tests.

use std::sync::Arc;

use odata_core::{
    InMemoryMetadata, MetadataCache, ODataResult, PrimitiveKind, ResourceSet, ResourceType,
    ServiceConfig,
};
use odata_uri::{RawQuery, RequestDescription, UriProcessor};

pub struct Service {
    pub metadata: InMemoryMetadata,
    pub config: ServiceConfig,
    pub cache: MetadataCache,
}

impl Service {
    pub fn process(&self, path: &str, query: &RawQuery) -> ODataResult<RequestDescription> {
        self.process_versioned(path, query, None, None)
    }

    pub fn process_versioned(
        &self,
        path: &str,
        query: &RawQuery,
        dsv: Option<&str>,
        max_dsv: Option<&str>,
    ) -> ODataResult<RequestDescription> {
        UriProcessor::new(&self.metadata, &self.config, &self.cache)
            .process(path, query, dsv, max_dsv)
    }
}

pub fn northwind(config: ServiceConfig) -> Service {
    let address = Arc::new(
        ResourceType::complex("Address")
            .with_primitive("City", PrimitiveKind::String)
            .with_primitive("Zip", PrimitiveKind::String),
    );
    let customer_stub = Arc::new(
        ResourceType::entity("Customer")
            .with_key("CustomerID", PrimitiveKind::String)
            .with_key("CustomerGuid", PrimitiveKind::Guid),
    );
    let order = Arc::new(
        ResourceType::entity("Order")
            .with_key("OrderID", PrimitiveKind::Int32)
            .with_primitive("ShipName", PrimitiveKind::String)
            .with_primitive("OrderDate", PrimitiveKind::DateTime)
            .with_primitive("Freight", PrimitiveKind::Decimal)
            .with_reference("Customer", customer_stub),
    );
    let customer = Arc::new(
        ResourceType::entity("Customer")
            .with_key("CustomerID", PrimitiveKind::String)
            .with_key("CustomerGuid", PrimitiveKind::Guid)
            .with_primitive("CompanyName", PrimitiveKind::String)
            .with_primitive("Employees", PrimitiveKind::Int32)
            .with_complex("Address", address)
            .with_primitive_bag("Tags", PrimitiveKind::String)
            .with_set_reference("Orders", Arc::clone(&order)),
    );
    let photo = Arc::new(
        ResourceType::entity("Photo")
            .with_key("PhotoID", PrimitiveKind::Int32)
            .as_media_link_entry(),
    );
    let metadata = InMemoryMetadata::new()
        .with_set(ResourceSet::new("Customers", customer))
        .with_set(ResourceSet::new("Orders", order))
        .with_set(ResourceSet::new("Photos", photo));
    Service {
        metadata,
        config,
        cache: MetadataCache::new(),
    }
}

pub const ALFKI: &str =
    "Customers(CustomerID='ALFKI',CustomerGuid=guid'123e4567-e89b-12d3-a456-426614174000')";
