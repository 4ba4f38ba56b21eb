//! Error types for media-dl
//!
//! This module provides the error handling for the crate, including:
//! - Domain-specific error variants for each job failure mode
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Diagnostic detail from the external acquisition tool (its stderr) is kept
//! on the error for logging but is never serialized into an [`ApiError`], so
//! it cannot leak to HTTP callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Request validation failed (missing or malformed parameter)
    #[error("validation error: {0}")]
    Validation(String),

    /// The external acquisition tool exited with a nonzero status
    ///
    /// `diagnostic` holds the tool's stderr for logging only.
    #[error("acquisition failed with exit status {status}")]
    AcquisitionFailed {
        /// Exit status reported by the tool (-1 when killed by signal)
        status: i32,
        /// Captured stderr, for logs only, never forwarded to the caller
        diagnostic: String,
    },

    /// The acquisition tool exceeded its wall-clock timeout and was killed
    #[error("acquisition timed out after {seconds}s")]
    AcquisitionTimeout {
        /// Configured timeout that was exceeded
        seconds: u64,
    },

    /// Workspace directory could not be created
    #[error("storage error: {0}")]
    Storage(String),

    /// The tool exited 0 but wrote no file matching the expected extension
    #[error("acquisition produced no output matching .{extension}")]
    NoOutput {
        /// Extension that was expected in the workspace
        extension: String,
    },

    /// A single-item job produced more than one matching file
    ///
    /// Historically the first directory entry was picked silently; this is
    /// surfaced as its own error instead (see DESIGN.md).
    #[error("acquisition produced {count} files where exactly one was expected")]
    AmbiguousOutput {
        /// Number of matching files found
        count: usize,
    },

    /// Archive construction failed mid-stream
    #[error("archive error: {0}")]
    Archive(String),

    /// The external transcoding tool failed
    #[error("transcode failed with exit status {status}")]
    Transcode {
        /// Exit status reported by the tool (-1 when killed by signal)
        status: i32,
        /// Captured stderr, for logs only, never forwarded to the caller
        diagnostic: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),
}

/// Trait for mapping errors to HTTP status codes and error codes
pub trait ToHttpStatus {
    /// HTTP status code for this error
    fn status_code(&self) -> u16;
    /// Machine-readable error code string
    fn error_code(&self) -> &'static str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NoOutput { .. } => 404,
            Error::AcquisitionFailed { .. }
            | Error::AcquisitionTimeout { .. }
            | Error::Storage(_)
            | Error::AmbiguousOutput { .. }
            | Error::Archive(_)
            | Error::Transcode { .. }
            | Error::Io(_)
            | Error::ApiServer(_) => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::AcquisitionFailed { .. } => "acquisition_failed",
            Error::AcquisitionTimeout { .. } => "acquisition_timeout",
            Error::Storage(_) => "storage_error",
            Error::NoOutput { .. } => "no_output_produced",
            Error::AmbiguousOutput { .. } => "ambiguous_output",
            Error::Archive(_) => "archive_error",
            Error::Transcode { .. } => "transcode_failed",
            Error::Io(_) => "io_error",
            Error::ApiServer(_) => "api_server_error",
        }
    }
}

impl Error {
    /// Generic caller-facing message for this error
    ///
    /// Internal diagnostics (tool stderr, filesystem paths) are deliberately
    /// absent; they go to the logs at the job boundary instead.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::Validation(_) => "missing or invalid request parameter",
            Error::AcquisitionFailed { .. } => "media download failed",
            Error::AcquisitionTimeout { .. } => "media download timed out",
            Error::Storage(_) => "internal storage error",
            Error::NoOutput { .. } => "no media found for the requested format",
            Error::AmbiguousOutput { .. } => "media download produced ambiguous output",
            Error::Archive(_) => "archive construction failed",
            Error::Transcode { .. } => "media processing failed",
            Error::Io(_) | Error::ApiServer(_) => "internal server error",
        }
    }
}

/// Structured JSON error response body
///
/// Serialized as `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error detail payload
    pub error: ErrorDetail,
}

/// Inner error payload of [`ApiError`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "acquisition_timeout")
    pub code: String,
    /// Generic human-readable message
    pub message: String,
}

impl From<&Error> for ApiError {
    fn from(err: &Error) -> Self {
        ApiError {
            error: ErrorDetail {
                code: err.error_code().to_string(),
                message: err.public_message().to_string(),
            },
        }
    }
}
