//! `POST links` / `POST links/add`: create a short link.
//!
//! Unsigned. Only encrypted `syncany://` links are accepted.

use syncany_protocol::ops::{ShortLinkResponse, ARG_LINK, MAX_LONG_LINK_BYTES};
use syncany_protocol::{ApiError, ApiRequest};

use super::Reply;
use crate::services::Services;

/// Required prefix of long links.
pub const LINK_SCHEME_PREFIX: &str = "syncany://";

/// Marker of unencrypted links.
const NOT_ENCRYPTED_MARKER: &str = "not-encrypted";

/// Check a long link.
pub fn check_long_link(long_link: Option<&str>) -> Result<&str, ApiError> {
    let long_link = long_link.ok_or_else(|| ApiError::invalid_request("No link provided"))?;

    if !long_link.starts_with(LINK_SCHEME_PREFIX) {
        return Err(ApiError::invalid_request("Invalid link format"));
    }
    if long_link.contains(NOT_ENCRYPTED_MARKER) {
        return Err(ApiError::invalid_request("Unencrypted links not allowed"));
    }
    if long_link.len() > MAX_LONG_LINK_BYTES {
        return Err(ApiError::invalid_request("Link too long"));
    }

    Ok(long_link)
}

/// Handle `POST links` and `POST links/add`.
pub fn handle(services: &Services, request: &ApiRequest) -> Result<Reply, ApiError> {
    let long_link = check_long_link(request.arg(ARG_LINK))?;

    let short_link_id = services.links().add(long_link).map_err(|e| {
        tracing::error!(request_id = %request.request_id, error = %e, "Cannot store link");
        ApiError::from(&e)
    })?;

    Reply::ok(&ShortLinkResponse { short_link_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncany_protocol::ErrorCode;

    #[test]
    fn test_check_long_link() {
        assert!(check_long_link(Some("syncany://storage/1/abc")).is_ok());

        for bad in [None, Some("http://example.com"), Some("syncany://storage/1/not-encrypted/abc")] {
            assert_eq!(check_long_link(bad).unwrap_err().code, ErrorCode::InvalidRequest);
        }

        let long = format!("syncany://{}", "a".repeat(MAX_LONG_LINK_BYTES));
        assert!(check_long_link(Some(&long)).is_err());

        let exact = format!("syncany://{}", "a".repeat(MAX_LONG_LINK_BYTES - LINK_SCHEME_PREFIX.len()));
        assert!(check_long_link(Some(&exact)).is_ok());
    }
}
