//! `GET links`: resolve a short link.

use syncany_protocol::ops::{LinkLocationResponse, ARG_LINK};
use syncany_protocol::{ApiError, ApiRequest};

use super::Reply;
use crate::services::Services;
use crate::validate;

/// Handle `GET links`. The id comes from `l` or the first path argument.
pub fn handle(services: &Services, request: &ApiRequest) -> Result<Reply, ApiError> {
    let short_link_id = request
        .arg(ARG_LINK)
        .or_else(|| request.path_args.first().map(String::as_str))
        .ok_or_else(|| ApiError::invalid_request("No link provided"))?;

    if !validate::is_short_link(short_link_id) {
        return Err(ApiError::invalid_request("Invalid link format"));
    }

    let location = services
        .links()
        .resolve(short_link_id)
        .map_err(|e| {
            tracing::error!(request_id = %request.request_id, error = %e, "Cannot read link store");
            ApiError::from(&e)
        })?
        .ok_or_else(|| ApiError::not_found("Link does not exist."))?;

    Reply::ok(&LinkLocationResponse { location })
}
