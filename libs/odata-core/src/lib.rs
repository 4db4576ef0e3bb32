//! Core model for the OData read path: primitive type system, metadata
//! model, row capability interface, protocol versions, service
//! configuration and the error taxonomy.
//!
//! The URI-to-query-plan compiler lives in the companion `odata-uri` crate;
//! this crate carries everything both the compiler and its collaborators
//! (execution, serialization) share.

pub mod config;
pub mod error;
pub mod metadata;
pub mod record;
pub mod types;
pub mod value;
pub mod version;

pub use config::ServiceConfig;
pub use error::{ODataError, ODataResult};
pub use metadata::{
    InMemoryMetadata, MetadataCache, MetadataProvider, ResourceProperty, ResourcePropertyKind,
    ResourceSet, ResourceType, ResourceTypeKind,
};
pub use record::{FieldValue, Record, ValueMap};
pub use types::PrimitiveKind;
pub use value::Value;
pub use version::ProtocolVersion;
