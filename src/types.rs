//! Shared error type for the export pipeline.

use thiserror::Error;

/// Errors produced while talking to the catalog API or writing the export.
///
/// Transport and decode failures are converted to `Failed` outcomes at each
/// fetch boundary (see [`crate::catalog::FetchOutcome`]); only output-sink
/// I/O errors propagate out of the pipeline.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Transport-level failure: connection, non-2xx status, or body decode.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL and a path did not combine into a valid URL.
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    /// A credential contained bytes that cannot be sent as a header value.
    #[error("invalid credential for header {header}")]
    Credential {
        header: &'static str,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    /// The response decoded but violated an expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// JSON serialization failure (error-log records).
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Filesystem failure on the output sink or error log.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
