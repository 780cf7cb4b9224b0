//! `GET app`: latest application releases.
//!
//! Optional filters: `dist` (or first path argument), `type`, `os`, `arch`,
//! `snapshots`. Invalid filter values are ignored rather than rejected.

use syncany_protocol::ops::{
    Architecture, ArtifactType, Dist, LatestReleasesResponse, OperatingSystem,
};
use syncany_protocol::{ApiError, ApiRequest};

use super::{parse_flag, Reply};
use crate::release_index::ReleaseQuery;
use crate::services::Services;

/// Build the query from request arguments.
pub fn query_from(request: &ApiRequest) -> ReleaseQuery {
    let dist = request
        .non_empty_arg("dist")
        .or_else(|| request.path_args.first().map(String::as_str))
        .and_then(|v| v.parse::<Dist>().ok())
        .filter(|d| *d != Dist::Other);

    let artifact_type = request
        .arg("type")
        .and_then(|v| v.parse::<ArtifactType>().ok())
        .filter(|t| t.is_release());

    ReleaseQuery {
        dist,
        artifact_type,
        os: request.arg("os").and_then(|v| v.parse::<OperatingSystem>().ok()),
        arch: request.arg("arch").and_then(|v| v.parse::<Architecture>().ok()),
        include_snapshots: parse_flag(request.arg("snapshots")).unwrap_or(false),
    }
}

/// Handle `GET app`.
pub fn handle(services: &Services, request: &ApiRequest) -> Result<Reply, ApiError> {
    let query = query_from(request);
    tracing::debug!(request_id = %request.request_id, query = ?query, "Querying latest releases");

    let entries = services.releases().latest(&query).map_err(|e| {
        tracing::error!(request_id = %request.request_id, error = %e, "Cannot read release index");
        ApiError::from(&e)
    })?;

    let base_url = &services.config().base_url;
    let response = LatestReleasesResponse {
        releases: entries.iter().map(|e| e.to_info(base_url)).collect(),
    };

    let status = if response.releases.is_empty() { 204 } else { 200 };
    Reply::with_status(status, &response)
}
