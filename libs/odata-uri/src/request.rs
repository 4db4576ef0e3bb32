//! The compiled request: everything execution and serialization need to
//! run a query without re-reading the URI.

use std::sync::Arc;

use odata_core::{FieldValue, ProtocolVersion, ResourceSet, ResourceType};

use crate::compiler::FilterInfo;
use crate::orderby::OrderByInfo;
use crate::projection::RootProjectionNode;
use crate::segments::{SegmentDescriptor, TargetKind, TargetSource};
use crate::skiptoken::SkipTokenInfo;

/// How the row count participates in the response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RequestCountOption {
    /// Not requested.
    #[default]
    None,
    /// `$inlinecount=allpages`: count rides along with the feed.
    Inline,
    /// A `$count` path segment: the count is the whole response.
    ValueOnly,
}

/// The query plan produced by [`crate::processor::UriProcessor::process`].
#[derive(Clone, Debug)]
pub struct RequestDescription {
    pub(crate) path: String,
    pub(crate) segments: Vec<SegmentDescriptor>,
    pub(crate) top_count: Option<u64>,
    pub(crate) skip_count: Option<u64>,
    pub(crate) count_option: RequestCountOption,
    pub(crate) count_value: Option<u64>,
    pub(crate) filter_info: Option<FilterInfo>,
    pub(crate) order_info: Option<Arc<OrderByInfo>>,
    pub(crate) skip_token_info: Option<SkipTokenInfo>,
    pub(crate) projection: Option<RootProjectionNode>,
    pub(crate) request_version: ProtocolVersion,
    pub(crate) response_version: ProtocolVersion,
    pub(crate) is_link_uri: bool,
    pub(crate) etag_allowed: bool,
    pub(crate) needs_execution: bool,
    pub(crate) execution_result: Option<FieldValue>,
}

impl RequestDescription {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn segments(&self) -> &[SegmentDescriptor] {
        &self.segments
    }

    /// The last segment; the request target. Paths always produce at
    /// least one segment.
    #[must_use]
    pub fn last_segment(&self) -> &SegmentDescriptor {
        self.segments
            .last()
            .unwrap_or_else(|| unreachable!("a parsed path has at least one segment"))
    }

    #[must_use]
    pub fn target_kind(&self) -> TargetKind {
        self.last_segment().target_kind
    }

    #[must_use]
    pub fn target_source(&self) -> TargetSource {
        self.last_segment().target_source
    }

    #[must_use]
    pub fn target_resource_type(&self) -> Option<&Arc<ResourceType>> {
        self.last_segment().resource_type.as_ref()
    }

    #[must_use]
    pub fn target_resource_set(&self) -> Option<&Arc<ResourceSet>> {
        self.last_segment().resource_set.as_ref()
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.last_segment().identifier
    }

    #[must_use]
    pub fn is_single_result(&self) -> bool {
        self.last_segment().single_result
    }

    /// Effective `$top` after the server page size is applied.
    #[must_use]
    pub fn top_count(&self) -> Option<u64> {
        self.top_count
    }

    #[must_use]
    pub fn skip_count(&self) -> Option<u64> {
        self.skip_count
    }

    #[must_use]
    pub fn count_option(&self) -> RequestCountOption {
        self.count_option
    }

    /// Row count recorded by execution for `$inlinecount`/`$count`.
    #[must_use]
    pub fn count_value(&self) -> Option<u64> {
        self.count_value
    }

    pub fn set_count_value(&mut self, count: u64) {
        self.count_value = Some(count);
    }

    #[must_use]
    pub fn filter_info(&self) -> Option<&FilterInfo> {
        self.filter_info.as_ref()
    }

    /// The full result ordering, when one applies to the target.
    #[must_use]
    pub fn order_info(&self) -> Option<&Arc<OrderByInfo>> {
        self.order_info.as_ref()
    }

    #[must_use]
    pub fn skip_token_info(&self) -> Option<&SkipTokenInfo> {
        self.skip_token_info.as_ref()
    }

    #[must_use]
    pub fn projection(&self) -> Option<&RootProjectionNode> {
        self.projection.as_ref()
    }

    /// The protocol version the request was effectively declared with.
    #[must_use]
    pub fn request_version(&self) -> ProtocolVersion {
        self.request_version
    }

    /// The version the response must be rendered with.
    #[must_use]
    pub fn response_version(&self) -> ProtocolVersion {
        self.response_version
    }

    #[must_use]
    pub fn is_link_uri(&self) -> bool {
        self.is_link_uri
    }

    /// Whether an ETag header may be processed for this target.
    #[must_use]
    pub fn etag_allowed(&self) -> bool {
        self.etag_allowed
    }

    /// False for `$metadata`, the service document and `$batch`.
    #[must_use]
    pub fn needs_execution(&self) -> bool {
        self.needs_execution
    }

    #[must_use]
    pub fn execution_result(&self) -> Option<&FieldValue> {
        self.execution_result.as_ref()
    }

    pub fn set_execution_result(&mut self, result: FieldValue) {
        self.execution_result = Some(result);
    }
}
