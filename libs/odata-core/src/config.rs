use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::version::ProtocolVersion;

/// Per-service behavior switches consumed by the URI compiler.
///
/// Page sizes are configured per resource set; `0` or absent means no
/// server-driven paging for that set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    page_sizes: HashMap<String, u32>,
    pub projections_enabled: bool,
    pub count_enabled: bool,
    pub max_protocol_version: ProtocolVersion,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            page_sizes: HashMap::new(),
            projections_enabled: true,
            count_enabled: true,
            max_protocol_version: ProtocolVersion::V3,
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page_size(mut self, resource_set: impl Into<String>, size: u32) -> Self {
        self.page_sizes.insert(resource_set.into(), size);
        self
    }

    #[must_use]
    pub fn with_projections_enabled(mut self, enabled: bool) -> Self {
        self.projections_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_count_enabled(mut self, enabled: bool) -> Self {
        self.count_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_max_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.max_protocol_version = version;
        self
    }

    /// Effective page size for a resource set; `None` when paging is off.
    #[must_use]
    pub fn page_size(&self, resource_set: &str) -> Option<u32> {
        match self.page_sizes.get(resource_set) {
            Some(0) | None => None,
            Some(size) => Some(*size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_zero_means_no_paging() {
        let config = ServiceConfig::new()
            .with_page_size("Customers", 5)
            .with_page_size("Orders", 0);
        assert_eq!(config.page_size("Customers"), Some(5));
        assert_eq!(config.page_size("Orders"), None);
        assert_eq!(config.page_size("Unknown"), None);
    }

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert!(config.projections_enabled);
        assert!(config.count_enabled);
        assert_eq!(config.max_protocol_version, ProtocolVersion::V3);
    }
}
