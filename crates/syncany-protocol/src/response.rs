//! API response types.

use serde::{Deserialize, Serialize};
use crate::error::ApiError;

/// API response envelope.
///
/// The server emits a single JSON response line on stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Request ID echoed from the request.
    pub request_id: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// HTTP-equivalent status code.
    pub status: u16,
    /// Success payload (present when ok=true and there is content).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error details (present when ok=false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ApiResponse {
    /// Create a 200 success response.
    pub fn success(request_id: String, payload: serde_json::Value) -> Self {
        Self::with_status(request_id, 200, payload)
    }

    /// Create a success response with an explicit status (e.g. 204).
    pub fn with_status(request_id: String, status: u16, payload: serde_json::Value) -> Self {
        Self {
            request_id,
            ok: true,
            status,
            payload: Some(payload),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(request_id: String, error: ApiError) -> Self {
        Self {
            request_id,
            ok: false,
            status: error.code.http_status(),
            payload: None,
            error: Some(error),
        }
    }
}
