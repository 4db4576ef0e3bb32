//! Error taxonomy for the read-path pipeline.
//!
//! Protocol violations surface as [`ODataError`] values with an HTTP status
//! and, for several conditions, message text that is part of the observable
//! contract. Internal invariant violations are not representable here; the
//! pipeline uses `debug_assert!`/`unreachable!` for those.

use http::StatusCode;

use crate::version::ProtocolVersion;

pub type ODataResult<T> = Result<T, ODataError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ODataError {
    /// Malformed URI segment, key predicate or query-option grammar.
    #[error("{0}")]
    Syntax(String),

    /// Unknown segment name or unresolvable property.
    #[error("{0}")]
    ResourceNotFound(String),

    /// A query option that is not legal for the resolved target kind.
    #[error("{0}")]
    NotApplicable(String),

    /// The declared request version is below what the query requires.
    #[error("{0}")]
    RequestVersionTooLow(String),

    /// Rendering the response would exceed a negotiated version ceiling.
    #[error("{0}")]
    ResponseVersionTooHigh(String),
}

impl ODataError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ODataError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        ODataError::Syntax(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ODataError::ResourceNotFound(message.into())
    }

    /// `Query option $x cannot be applied to the requested resource`
    #[must_use]
    pub fn option_not_applicable(option: &str) -> Self {
        ODataError::NotApplicable(format!(
            "Query option {option} cannot be applied to the requested resource"
        ))
    }

    /// `Query options $a, $b and $c cannot be applied to the requested
    /// resource` — comma-separated with `and` before the last option.
    #[must_use]
    pub fn options_not_applicable(options: &[&str]) -> Self {
        debug_assert!(!options.is_empty());
        if options.len() == 1 {
            return Self::option_not_applicable(options[0]);
        }
        let (last, head) = options.split_last().unwrap_or((&options[0], &[]));
        ODataError::NotApplicable(format!(
            "Query options {} and {last} cannot be applied to the requested resource",
            head.join(", ")
        ))
    }

    /// `Incorrect format for $top`
    #[must_use]
    pub fn incorrect_format(option: &str) -> Self {
        ODataError::Syntax(format!("Incorrect format for {option}"))
    }

    #[must_use]
    pub fn unknown_inline_count() -> Self {
        ODataError::Syntax(
            "Unknown $inlinecount option, only \"allpages\" and \"none\" are supported".into(),
        )
    }

    #[must_use]
    pub fn request_version_too_low(actual: ProtocolVersion, required: ProtocolVersion) -> Self {
        ODataError::RequestVersionTooLow(format!(
            "Request version '{actual}' is not supported; this request requires version '{required}'"
        ))
    }

    #[must_use]
    pub fn response_version_exceeds_client(
        required: ProtocolVersion,
        client_max: ProtocolVersion,
    ) -> Self {
        ODataError::ResponseVersionTooHigh(format!(
            "The response requires that version {required} of the protocol be used, but the MaxDataServiceVersion of the request is set to {client_max}"
        ))
    }

    #[must_use]
    pub fn response_version_exceeds_service(
        required: ProtocolVersion,
        service_max: ProtocolVersion,
    ) -> Self {
        ODataError::ResponseVersionTooHigh(format!(
            "The response requires that version {required} of the protocol be used, but the MaxProtocolVersion of the data service is set to {service_max}"
        ))
    }
}
