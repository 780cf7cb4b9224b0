//! `PUT app/osxnotifier`: upload of the OS X notifier bundle.

use std::io::Read;

use syncany_protocol::ops::{contexts, ArtifactType, Channel, UploadResponse};
use syncany_protocol::{ApiError, ApiRequest};

use super::{parse_flag, upload_failure, Reply};
use crate::context::SecurityContext;
use crate::services::Services;
use crate::upload::{UploadError, UploadPlan};
use crate::validate;

/// Handle `PUT app/osxnotifier`. Arguments: `checksum`, `filename`, `snapshot`.
pub fn handle(services: &Services, request: &ApiRequest, body: &mut dyn Read) -> Result<Reply, ApiError> {
    tracing::info!(request_id = %request.request_id, "Put request for OSX notifier received, authenticating");
    let context = SecurityContext::new(contexts::OSX_NOTIFIER_PUT).map_err(|e| ApiError::from(&e))?;

    let completed = services
        .orchestrator()
        .execute(&context, request, body, |signed| {
            let arg = |key: &str| signed.args().get(key).map(String::as_str);

            let checksum = arg("checksum")
                .filter(|v| validate::is_checksum(v))
                .ok_or_else(|| UploadError::invalid_argument("No or invalid checksum given."))?;
            let filename = arg("filename")
                .filter(|v| validate::is_file_name(v))
                .ok_or_else(|| UploadError::invalid_argument("No or invalid filename given."))?;
            let snapshot = parse_flag(arg("snapshot"))
                .ok_or_else(|| UploadError::invalid_argument("No or invalid snapshot argument given."))?;

            Ok(UploadPlan {
                suffix: ArtifactType::AppZip.file_suffix().to_string(),
                checksum: checksum.to_string(),
                channel: Channel::from_snapshot(snapshot),
                filename: filename.to_string(),
                publisher: services.dist_publisher(),
            })
        })
        .map_err(|e| upload_failure(request, e))?;

    Reply::ok(&UploadResponse {
        checksum: completed.artifact.checksum,
        channel: completed.channel,
        fullpath: completed.fullpath,
    })
}
