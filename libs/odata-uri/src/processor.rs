//! The URI processor: orchestrates path parsing, the query-option
//! parsers and protocol-version negotiation into one
//! [`RequestDescription`].
//!
//! Option processing runs in a fixed order so that the observable errors
//! are stable: set-option applicability, `$skip`/`$top`, `$orderby`,
//! `$filter`, `$skiptoken`, `$expand`/`$select`, `$inlinecount`, then
//! the version checks.

use std::sync::Arc;

use odata_core::{
    MetadataCache, MetadataProvider, ODataError, ODataResult, ProtocolVersion, ServiceConfig,
};
use tracing::debug;

use crate::compiler::compile_filter;
use crate::filter::parse_filter;
use crate::orderby::parse_orderby;
use crate::projection::parse_projections;
use crate::request::{RequestCountOption, RequestDescription};
use crate::segments::{parse_path, TargetKind};
use crate::skiptoken::parse_skip_token;

/// Raw query options, decoded but unparsed.
#[derive(Clone, Debug, Default)]
pub struct RawQuery {
    pub filter: Option<String>,
    pub orderby: Option<String>,
    pub top: Option<String>,
    pub skip: Option<String>,
    pub skiptoken: Option<String>,
    pub inlinecount: Option<String>,
    pub select: Option<String>,
    pub expand: Option<String>,
}

impl RawQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, raw: impl Into<String>) -> Self {
        self.filter = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_orderby(mut self, raw: impl Into<String>) -> Self {
        self.orderby = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_top(mut self, raw: impl Into<String>) -> Self {
        self.top = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_skip(mut self, raw: impl Into<String>) -> Self {
        self.skip = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_skiptoken(mut self, raw: impl Into<String>) -> Self {
        self.skiptoken = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_inlinecount(mut self, raw: impl Into<String>) -> Self {
        self.inlinecount = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_select(mut self, raw: impl Into<String>) -> Self {
        self.select = Some(raw.into());
        self
    }

    #[must_use]
    pub fn with_expand(mut self, raw: impl Into<String>) -> Self {
        self.expand = Some(raw.into());
        self
    }

    /// Parse a raw query string (with or without the leading `?`).
    /// Unknown `$`-prefixed options are rejected; everything else is a
    /// custom parameter and is ignored.
    ///
    /// # Errors
    /// `Syntax` for unknown system options, duplicated options or
    /// undecodable percent escapes.
    pub fn from_query_str(raw: &str) -> ODataResult<Self> {
        let mut query = RawQuery::new();
        for pair in raw.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(key)
                .map_err(|_| ODataError::syntax(format!("Malformed query parameter '{pair}'")))?;
            // Form encoding spells spaces as '+'; swap before unescaping
            // so a literal %2B survives.
            let value = urlencoding::decode(&value.replace('+', " "))
                .map_err(|_| ODataError::syntax(format!("Malformed query parameter '{pair}'")))?
                .into_owned();
            let slot = match key.as_ref() {
                "$filter" => &mut query.filter,
                "$orderby" => &mut query.orderby,
                "$top" => &mut query.top,
                "$skip" => &mut query.skip,
                "$skiptoken" => &mut query.skiptoken,
                "$inlinecount" => &mut query.inlinecount,
                "$select" => &mut query.select,
                "$expand" => &mut query.expand,
                other if other.starts_with('$') => {
                    return Err(ODataError::syntax(format!(
                        "The query parameter '{other}' begins with a system-reserved '$' character but is not a recognized query option"
                    )));
                }
                _ => continue,
            };
            if slot.is_some() {
                return Err(ODataError::syntax(format!(
                    "Query option '{key}' was specified more than once"
                )));
            }
            *slot = Some(value);
        }
        Ok(query)
    }
}

/// Version floors accumulated while options are processed; checked once,
/// at the end, so applicability errors win over version errors.
#[derive(Clone, Copy, Debug)]
struct VersionTracker {
    min_request: ProtocolVersion,
    min_response: ProtocolVersion,
}

impl VersionTracker {
    fn new() -> Self {
        Self {
            min_request: ProtocolVersion::V1,
            min_response: ProtocolVersion::V1,
        }
    }

    fn raise_request(&mut self, version: ProtocolVersion) {
        self.min_request = self.min_request.max(version);
    }

    fn raise_response(&mut self, version: ProtocolVersion) {
        self.min_response = self.min_response.max(version);
    }
}

/// Compiles request URIs into [`RequestDescription`] query plans.
pub struct UriProcessor<'a> {
    metadata: &'a dyn MetadataProvider,
    config: &'a ServiceConfig,
    cache: &'a MetadataCache,
}

impl<'a> UriProcessor<'a> {
    #[must_use]
    pub fn new(
        metadata: &'a dyn MetadataProvider,
        config: &'a ServiceConfig,
        cache: &'a MetadataCache,
    ) -> Self {
        Self {
            metadata,
            config,
            cache,
        }
    }

    /// Compile `path` plus `query` into a query plan.
    ///
    /// `data_service_version` and `max_data_service_version` are the raw
    /// header values; an absent header defaults to the service's
    /// configured maximum.
    ///
    /// # Errors
    /// Every protocol violation surfaces here: `ResourceNotFound` for
    /// unknown segments and properties, `Syntax` and `NotApplicable`
    /// for bad options, and the version variants from negotiation.
    pub fn process(
        &self,
        path: &str,
        query: &RawQuery,
        data_service_version: Option<&str>,
        max_data_service_version: Option<&str>,
    ) -> ODataResult<RequestDescription> {
        let segments = parse_path(path, self.metadata)?;
        let last = segments
            .last()
            .cloned()
            .unwrap_or_else(|| unreachable!("parse_path yields at least one segment"));
        debug!(target_kind = ?last.target_kind, identifier = %last.identifier, "resolved path");

        let mut versions = VersionTracker::new();
        let is_link_uri = segments
            .iter()
            .any(|s| s.target_kind == TargetKind::Link);

        // Service specials take no query options at all.
        if matches!(
            last.target_kind,
            TargetKind::Metadata | TargetKind::ServiceDirectory | TargetKind::Batch
        ) {
            let (request_version, response_version) = self.negotiate(
                versions,
                data_service_version,
                max_data_service_version,
            )?;
            return Ok(RequestDescription {
                path: path.to_owned(),
                segments,
                top_count: None,
                skip_count: None,
                count_option: RequestCountOption::None,
                count_value: None,
                filter_info: None,
                order_info: None,
                skip_token_info: None,
                projection: None,
                request_version,
                response_version,
                is_link_uri: false,
                etag_allowed: false,
                needs_execution: false,
                execution_result: None,
            });
        }

        let count_option = if last.identifier == "$count" {
            if !self.config.count_enabled {
                return Err(ODataError::NotApplicable(
                    "The ability of the data service to return row counts is disabled".to_owned(),
                ));
            }
            versions.raise_request(ProtocolVersion::V2);
            RequestCountOption::ValueOnly
        } else {
            RequestCountOption::None
        };

        if last.target_kind == TargetKind::Bag {
            versions.raise_request(ProtocolVersion::V3);
            versions.raise_response(ProtocolVersion::V3);
        }

        // A $count segment behaves like its underlying set for the
        // set-only options.
        let addresses_collection = (!last.single_result
            && matches!(last.target_kind, TargetKind::Resource | TargetKind::Link))
            || count_option == RequestCountOption::ValueOnly;

        if !addresses_collection {
            let mut offending = Vec::new();
            for (name, present) in [
                ("$orderby", query.orderby.is_some()),
                ("$inlinecount", query.inlinecount.is_some()),
                ("$skip", query.skip.is_some()),
                ("$top", query.top.is_some()),
            ] {
                if present {
                    offending.push(name);
                }
            }
            if !offending.is_empty() {
                return Err(ODataError::options_not_applicable(&offending));
            }
        }

        let skip_count = parse_nonnegative(query.skip.as_deref(), "$skip")?;
        let mut top_count = parse_nonnegative(query.top.as_deref(), "$top")?;

        // Server-driven paging clamps $top and forces a 2.0 response
        // whenever a next-link may be needed.
        let page_size = if addresses_collection && count_option != RequestCountOption::ValueOnly {
            last.resource_set
                .as_ref()
                .and_then(|set| self.config.page_size(&set.name))
                .map(u64::from)
        } else {
            None
        };
        if let Some(page) = page_size {
            match top_count {
                Some(top) if top <= page => {}
                _ => {
                    top_count = Some(page);
                    versions.raise_response(ProtocolVersion::V2);
                }
            }
        }

        let paging_required = addresses_collection
            && (page_size.is_some()
                || top_count.is_some()
                || skip_count.is_some()
                || query.skiptoken.is_some());

        let order_info = if addresses_collection {
            let element_type = last.resource_type.as_ref().ok_or_else(|| {
                ODataError::syntax(format!("The segment '{}' has no type", last.identifier))
            })?;
            parse_orderby(
                query.orderby.as_deref(),
                element_type,
                paging_required,
                self.cache,
            )?
            .map(Arc::new)
        } else {
            None
        };

        let filter_info = match query.filter.as_deref() {
            None => None,
            Some(raw) => {
                let filter_kind = if count_option == RequestCountOption::ValueOnly {
                    TargetKind::Resource
                } else {
                    last.target_kind
                };
                if !matches!(
                    filter_kind,
                    TargetKind::Resource | TargetKind::ComplexObject | TargetKind::Link
                ) {
                    return Err(ODataError::option_not_applicable("$filter"));
                }
                let element_type = last.resource_type.as_ref().ok_or_else(|| {
                    ODataError::syntax(format!("The segment '{}' has no type", last.identifier))
                })?;
                let expr = parse_filter(raw, element_type)?;
                Some(compile_filter(expr))
            }
        };

        let skip_token_info = match query.skiptoken.as_deref() {
            None => None,
            Some(raw) => {
                if !addresses_collection
                    || count_option == RequestCountOption::ValueOnly
                    || page_size.is_none()
                {
                    return Err(ODataError::option_not_applicable("$skiptoken"));
                }
                versions.raise_request(ProtocolVersion::V2);
                let order = order_info.as_ref().unwrap_or_else(|| {
                    unreachable!("a paginated collection always has an ordering")
                });
                Some(parse_skip_token(raw, order)?)
            }
        };

        let projection = if query.select.is_some() || query.expand.is_some() {
            let projectable = last.target_kind == TargetKind::Resource
                && count_option != RequestCountOption::ValueOnly
                && !is_link_uri;
            if !projectable {
                let mut offending = Vec::new();
                if query.select.is_some() {
                    offending.push("$select");
                }
                if query.expand.is_some() {
                    offending.push("$expand");
                }
                return Err(ODataError::options_not_applicable(&offending));
            }
            if query.select.is_some() {
                versions.raise_request(ProtocolVersion::V2);
                versions.raise_response(ProtocolVersion::V2);
            }
            let element_type = last.resource_type.as_ref().ok_or_else(|| {
                ODataError::syntax(format!("The segment '{}' has no type", last.identifier))
            })?;
            let root = parse_projections(
                query.expand.as_deref(),
                query.select.as_deref(),
                element_type,
                last.resource_set.as_ref(),
                self.metadata,
                self.config,
                self.cache,
            )?;
            if let Some(root) = &root {
                if root.has_paged_expansion {
                    versions.raise_response(ProtocolVersion::V2);
                }
            }
            root
        } else {
            None
        };

        // Give the serializer the root ordering alongside the tree when
        // the target set itself is paged.
        let projection = projection.map(|mut root| {
            if page_size.is_some() {
                root.node.order_info = order_info.as_deref().cloned();
            }
            root
        });

        let count_option = match query.inlinecount.as_deref() {
            None => count_option,
            Some(raw) => match raw.trim() {
                "none" => count_option,
                "allpages" => {
                    if count_option == RequestCountOption::ValueOnly {
                        return Err(ODataError::option_not_applicable("$inlinecount"));
                    }
                    if !self.config.count_enabled {
                        return Err(ODataError::NotApplicable(
                            "The ability of the data service to return row counts is disabled"
                                .to_owned(),
                        ));
                    }
                    versions.raise_request(ProtocolVersion::V2);
                    versions.raise_response(ProtocolVersion::V2);
                    RequestCountOption::Inline
                }
                _ => return Err(ODataError::unknown_inline_count()),
            },
        };

        let (request_version, response_version) =
            self.negotiate(versions, data_service_version, max_data_service_version)?;

        let etag_allowed = last.target_kind == TargetKind::Resource
            && last.single_result
            && !is_link_uri
            && projection.is_none();

        debug!(
            ?request_version,
            ?response_version,
            top = ?top_count,
            skip = ?skip_count,
            "compiled request"
        );

        Ok(RequestDescription {
            path: path.to_owned(),
            segments,
            top_count,
            skip_count,
            count_option,
            count_value: None,
            filter_info,
            order_info,
            skip_token_info,
            projection,
            request_version,
            response_version,
            is_link_uri,
            etag_allowed,
            needs_execution: true,
            execution_result: None,
        })
    }

    /// Run the three version checks in order: the request floor against
    /// the effective declared version, the response floor against the
    /// client ceiling, then both floors against the service cap.
    fn negotiate(
        &self,
        versions: VersionTracker,
        data_service_version: Option<&str>,
        max_data_service_version: Option<&str>,
    ) -> ODataResult<(ProtocolVersion, ProtocolVersion)> {
        let service_max = self.config.max_protocol_version;
        let declared = match data_service_version {
            Some(raw) => ProtocolVersion::parse_header(raw)?,
            None => service_max,
        };
        let client_max = match max_data_service_version {
            Some(raw) => ProtocolVersion::parse_header(raw)?,
            None => service_max,
        };

        let effective = declared.min(client_max);
        if effective < versions.min_request {
            return Err(ODataError::request_version_too_low(
                effective,
                versions.min_request,
            ));
        }
        let response_version = versions.min_response;
        if client_max < response_version {
            return Err(ODataError::response_version_exceeds_client(
                response_version,
                client_max,
            ));
        }
        let needed = versions.min_request.max(response_version);
        if service_max < needed {
            return Err(ODataError::response_version_exceeds_service(
                needed,
                service_max,
            ));
        }
        Ok((effective, response_version))
    }
}

fn parse_nonnegative(raw: Option<&str>, option: &str) -> ODataResult<Option<u64>> {
    match raw {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ODataError::incorrect_format(option));
            }
            trimmed
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ODataError::incorrect_format(option))
        }
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
