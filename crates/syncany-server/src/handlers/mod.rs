//! Operation handlers.
//!
//! Each operation has its own handler module. Handlers return a [`Reply`] or
//! an [`ApiError`] that is safe to show to the client.

pub mod app_get;
pub mod app_put;
pub mod links_add;
pub mod links_get;
pub mod osx_notifier_put;

use serde::Serialize;
use syncany_protocol::{ApiError, ApiRequest};

use crate::upload::UploadError;

/// Successful handler result.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// HTTP-equivalent status (200 or 204).
    pub status: u16,
    pub payload: serde_json::Value,
}

impl Reply {
    /// 200 with a serialized payload.
    pub fn ok<T: Serialize>(payload: &T) -> Result<Self, ApiError> {
        Self::with_status(200, payload)
    }

    pub fn with_status<T: Serialize>(status: u16, payload: &T) -> Result<Self, ApiError> {
        let payload = serde_json::to_value(payload).map_err(|e| {
            tracing::error!(error = %e, "Cannot serialize response payload");
            ApiError::server_error()
        })?;
        Ok(Self { status, payload })
    }
}

/// Log an upload failure with its detail and convert it for the client.
pub(crate) fn upload_failure(request: &ApiRequest, err: UploadError) -> ApiError {
    match &err {
        UploadError::Auth(_) | UploadError::InvalidArgument(_) => {
            tracing::warn!(request_id = %request.request_id, error = %err, "Upload refused")
        }
        _ => tracing::error!(request_id = %request.request_id, error = %err, "Upload failed"),
    }
    ApiError::from(&err)
}

/// Boolean argument in `true`/`false` form.
pub(crate) fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}
