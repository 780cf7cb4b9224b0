//! Link shortener operation types (`links` resource).

use serde::{Deserialize, Serialize};

/// Maximum accepted length of a long link.
pub const MAX_LONG_LINK_BYTES: usize = 4096;

/// Argument carrying a short link id (GET) or long link (POST).
pub const ARG_LINK: &str = "l";

/// Response payload of `POST links`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLinkResponse {
    pub short_link_id: String,
}

/// Response payload of `GET links`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkLocationResponse {
    pub location: String,
}
