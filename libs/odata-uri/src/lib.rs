//! URI-to-query-plan compiler for an OData v1-v3 read path.
//!
//! [`processor::UriProcessor`] takes a resource path, the raw query
//! options and the two protocol-version headers, runs the segment parser
//! and the per-option parsers in a fixed order, negotiates versions and
//! returns a [`request::RequestDescription`]: typed segments, a compiled
//! `$filter` predicate, a total `$orderby` ordering, the `$skiptoken`
//! resume point and the `$expand`/`$select` projection tree.

pub mod ast;
pub mod compiler;
pub mod filter;
pub mod lexer;
pub mod orderby;
pub mod processor;
pub mod projection;
pub mod request;
pub mod segments;
pub mod skiptoken;

mod text;

pub use compiler::{compile_filter, FilterInfo, Predicate};
pub use filter::parse_filter;
pub use orderby::{parse_orderby, Comparator, OrderByInfo, OrderByPathSegment};
pub use processor::{RawQuery, UriProcessor};
pub use projection::{
    parse_projections, ExpandedProjectionNode, ProjectionChild, ProjectionNode,
    RootProjectionNode,
};
pub use request::{RequestCountOption, RequestDescription};
pub use segments::{parse_path, KeyPredicate, SegmentDescriptor, TargetKind, TargetSource};
pub use skiptoken::{parse_skip_token, SkipTokenInfo};
