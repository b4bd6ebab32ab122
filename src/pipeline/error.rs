//! Pipeline error taxonomy.
//!
//! Every stage fails with a [`PipelineError`]. The orchestrator is the only
//! place that turns one into a response; the client sees the stable
//! [`ErrorKind`] string and operators see the variant's detail in logs.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while serving a graph request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Requested output format is unknown or not served.
    #[error("unsupported output format '{0}'")]
    InvalidFormat(String),

    /// File extension on the id disagrees with the declared format.
    #[error("extension '{extension}' does not match format '{format}'")]
    InvalidExtension { extension: String, format: String },

    /// Revision id is not a non-negative integer.
    #[error("invalid revision id '{0}'")]
    InvalidRevision(String),

    /// Page title contains the upstream multi-value separator.
    #[error("invalid page title '{0}'")]
    InvalidTitle(String),

    /// Neither a usable revision id nor a title was supplied.
    #[error("request has neither a revision id nor a page title")]
    MissingPageSelector,

    /// Spec id is not a lowercase hex string.
    #[error("invalid graph spec id '{0}'")]
    InvalidSpecId(String),

    /// Domain is not on the allow-list.
    #[error("domain '{0}' is not allowed")]
    InvalidDomain(String),

    /// Render-only request without a JSON object body.
    #[error("request body does not contain a graph spec: {0}")]
    MissingSpec(String),

    /// Upstream answered with a non-200 status.
    #[error("content API returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    /// Upstream reported an error, failed in transport, or never stopped paginating.
    #[error("content API error: {0}")]
    UpstreamError(String),

    /// Upstream payload could not be interpreted.
    #[error("malformed content API payload: {0}")]
    MalformedPayload(String),

    /// Every continuation page was scanned without finding the spec id.
    #[error("graph spec '{spec_id}' not found after {calls} API call(s)")]
    SpecNotFound { spec_id: String, calls: u32 },

    /// The renderer failed.
    #[error("render failed: {0}")]
    RenderError(String),

    /// The whole pipeline exceeded its deadline.
    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
}

/// Stable, client-facing failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidFormat,
    InvalidExtension,
    InvalidRevision,
    InvalidTitle,
    MissingPageSelector,
    InvalidSpecId,
    InvalidDomain,
    MissingSpec,
    UpstreamStatus,
    UpstreamError,
    MalformedPayload,
    SpecNotFound,
    RenderError,
    Timeout,
}

impl ErrorKind {
    /// The code written to the response body and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidFormat => "InvalidFormat",
            ErrorKind::InvalidExtension => "InvalidExtension",
            ErrorKind::InvalidRevision => "InvalidRevision",
            ErrorKind::InvalidTitle => "InvalidTitle",
            ErrorKind::MissingPageSelector => "MissingPageSelector",
            ErrorKind::InvalidSpecId => "InvalidSpecId",
            ErrorKind::InvalidDomain => "InvalidDomain",
            ErrorKind::MissingSpec => "MissingSpec",
            ErrorKind::UpstreamStatus => "UpstreamStatus",
            ErrorKind::UpstreamError => "UpstreamError",
            ErrorKind::MalformedPayload => "MalformedPayload",
            ErrorKind::SpecNotFound => "SpecNotFound",
            ErrorKind::RenderError => "RenderError",
            ErrorKind::Timeout => "Timeout",
        }
    }

    /// True for failures caused by the caller's input.
    pub fn is_client_input(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidFormat
                | ErrorKind::InvalidExtension
                | ErrorKind::InvalidRevision
                | ErrorKind::InvalidTitle
                | ErrorKind::MissingPageSelector
                | ErrorKind::InvalidSpecId
                | ErrorKind::InvalidDomain
                | ErrorKind::MissingSpec
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PipelineError {
    /// Classify this error into its taxonomy entry.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            PipelineError::InvalidExtension { .. } => ErrorKind::InvalidExtension,
            PipelineError::InvalidRevision(_) => ErrorKind::InvalidRevision,
            PipelineError::InvalidTitle(_) => ErrorKind::InvalidTitle,
            PipelineError::MissingPageSelector => ErrorKind::MissingPageSelector,
            PipelineError::InvalidSpecId(_) => ErrorKind::InvalidSpecId,
            PipelineError::InvalidDomain(_) => ErrorKind::InvalidDomain,
            PipelineError::MissingSpec(_) => ErrorKind::MissingSpec,
            PipelineError::UpstreamStatus { .. } => ErrorKind::UpstreamStatus,
            PipelineError::UpstreamError(_) => ErrorKind::UpstreamError,
            PipelineError::MalformedPayload(_) => ErrorKind::MalformedPayload,
            PipelineError::SpecNotFound { .. } => ErrorKind::SpecNotFound,
            PipelineError::RenderError(_) => ErrorKind::RenderError,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

/// Result type for pipeline stages.
pub type PipelineResult<T> = Result<T, PipelineError>;
