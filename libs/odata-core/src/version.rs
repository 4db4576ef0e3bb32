use serde::{Deserialize, Serialize};

use crate::error::{ODataError, ODataResult};

/// OData protocol versions understood by this service core.
///
/// Ordering follows the protocol: `V1 < V2 < V3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "1.0")]
    V1,
    #[serde(rename = "2.0")]
    V2,
    #[serde(rename = "3.0")]
    V3,
}

impl ProtocolVersion {
    /// Parse a `DataServiceVersion` / `MaxDataServiceVersion` header value.
    /// Trailing user-agent tokens after `;` are ignored (`"2.0;NetFx"`).
    ///
    /// # Errors
    /// Returns `ODataError::Syntax` for anything but `1.0`, `2.0` or `3.0`.
    pub fn parse_header(raw: &str) -> ODataResult<Self> {
        let version = raw.split(';').next().unwrap_or("").trim();
        match version {
            "1.0" => Ok(ProtocolVersion::V1),
            "2.0" => Ok(ProtocolVersion::V2),
            "3.0" => Ok(ProtocolVersion::V3),
            _ => Err(ODataError::syntax(format!(
                "The version value '{raw}' in the version header is not supported; it must be '1.0', '2.0' or '3.0'"
            ))),
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProtocolVersion::V1 => "1.0",
            ProtocolVersion::V2 => "2.0",
            ProtocolVersion::V3 => "3.0",
        };
        f.write_str(s)
    }
}
