//! Error types for the API protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes returned in API error responses.
///
/// These codes are stable and used for automation. Each maps onto the HTTP
/// status a web front end would return for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed envelope, missing required arguments, or invalid values.
    InvalidRequest,
    /// Authentication failed. Never says which check failed.
    Unauthorized,
    /// Unknown resource or unknown entity (e.g. short link).
    NotFound,
    /// Known resource, but no handler for the method/verb pair.
    MethodNotAllowed,
    /// Upload exceeds the maximum allowed size.
    PayloadTooLarge,
    /// Uploaded content does not match the claimed checksum.
    ChecksumMismatch,
    /// Server-side fault. Carries no internal detail.
    ServerError,
}

impl ErrorCode {
    /// HTTP status equivalent of this code.
    pub fn http_status(self) -> u16 {
        match self {
            Self::InvalidRequest | Self::ChecksumMismatch => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::PayloadTooLarge => 413,
            Self::ServerError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::MethodNotAllowed => write!(f, "METHOD_NOT_ALLOWED"),
            Self::PayloadTooLarge => write!(f, "PAYLOAD_TOO_LARGE"),
            Self::ChecksumMismatch => write!(f, "CHECKSUM_MISMATCH"),
            Self::ServerError => write!(f, "SERVER_ERROR"),
        }
    }
}

/// Message used for every authentication failure.
pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed";

/// Message used for every server-side fault.
pub const SERVER_ERROR_MESSAGE: &str = "Internal server error";

/// API error response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code from the registry.
    pub code: ErrorCode,
    /// Human-readable, single-line error message.
    /// Must not contain secrets, filesystem paths, or internal state.
    pub message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an INVALID_REQUEST error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Create the single, undifferentiated UNAUTHORIZED error.
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, AUTH_FAILED_MESSAGE)
    }

    /// Create a NOT_FOUND error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create a METHOD_NOT_ALLOWED error.
    pub fn method_not_allowed(method: &str, resource: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotAllowed,
            format!("method {} not supported for resource '{}'", method, resource),
        )
    }

    /// Create a PAYLOAD_TOO_LARGE error.
    pub fn payload_too_large(max: u64) -> Self {
        Self::new(
            ErrorCode::PayloadTooLarge,
            format!("upload exceeds maximum size of {} bytes", max),
        )
    }

    /// Create a CHECKSUM_MISMATCH error.
    pub fn checksum_mismatch() -> Self {
        Self::new(
            ErrorCode::ChecksumMismatch,
            "uploaded content does not match the given checksum",
        )
    }

    /// Create the generic SERVER_ERROR error.
    pub fn server_error() -> Self {
        Self::new(ErrorCode::ServerError, SERVER_ERROR_MESSAGE)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
