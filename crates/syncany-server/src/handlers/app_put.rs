//! `PUT app`: upload of an application release or snapshot.
//!
//! Arguments (all signed): `checksum`, `filename`, `version`, `date`,
//! `snapshot`, `os`, `arch`, `dist`, `type`. The file is published to the
//! distribution directory (`deb` packages also to the APT repository) and
//! recorded in the release index.

use std::io::Read;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use syncany_protocol::ops::{
    contexts, Architecture, ArtifactType, Channel, Dist, OperatingSystem, UploadResponse,
};
use syncany_protocol::{ApiError, ApiRequest, SignedRequest};

use super::{parse_flag, upload_failure, Reply};
use crate::context::SecurityContext;
use crate::release_index::ReleaseEntry;
use crate::services::Services;
use crate::upload::{UploadError, UploadPlan};
use crate::validate;

/// Validated release metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseArgs {
    pub checksum: String,
    pub filename: String,
    pub version: String,
    pub date: String,
    pub snapshot: bool,
    pub os: OperatingSystem,
    pub arch: Architecture,
    pub dist: Dist,
    pub artifact_type: ArtifactType,
}

impl ReleaseArgs {
    /// Validate the authenticated arguments.
    pub fn parse(signed: &SignedRequest) -> Result<Self, UploadError> {
        let arg = |key: &str| signed.args().get(key).map(String::as_str);

        let checksum = arg("checksum")
            .filter(|v| validate::is_checksum(v))
            .ok_or_else(|| UploadError::invalid_argument("No or invalid checksum given."))?;
        let filename = arg("filename")
            .filter(|v| validate::is_file_name(v))
            .ok_or_else(|| UploadError::invalid_argument("No or invalid filename given."))?;
        let version = arg("version")
            .filter(|v| validate::is_version(v))
            .ok_or_else(|| UploadError::invalid_argument("No or invalid version given."))?;
        let date = arg("date")
            .filter(|v| v.len() == 10 && NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok())
            .ok_or_else(|| UploadError::invalid_argument("No or invalid date given."))?;
        let snapshot = parse_flag(arg("snapshot"))
            .ok_or_else(|| UploadError::invalid_argument("No or invalid snapshot argument given."))?;
        let os = parse_required::<OperatingSystem>(arg("os"), "os")?;
        let arch = parse_required::<Architecture>(arg("arch"), "arch")?;
        let dist = parse_required::<Dist>(arg("dist"), "dist")?;
        let artifact_type = parse_required::<ArtifactType>(arg("type"), "type")?;

        check_supported(dist, artifact_type)?;

        Ok(Self {
            checksum: checksum.to_string(),
            filename: filename.to_string(),
            version: version.to_string(),
            date: date.to_string(),
            snapshot,
            os,
            arch,
            dist,
            artifact_type,
        })
    }

    pub fn channel(&self) -> Channel {
        Channel::from_snapshot(self.snapshot)
    }
}

fn parse_required<T: FromStr>(value: Option<&str>, name: &str) -> Result<T, UploadError> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| UploadError::invalid_argument(format!("No or invalid {} argument given.", name)))
}

/// Accepted (dist, type) combinations.
fn check_supported(dist: Dist, artifact_type: ArtifactType) -> Result<(), UploadError> {
    use ArtifactType::*;

    let supported = match dist {
        Dist::Cli => matches!(artifact_type, TarGz | Zip | Deb | Exe),
        Dist::Gui => matches!(artifact_type, AppZip | Exe),
        Dist::Other => false,
    };

    if supported {
        Ok(())
    } else {
        Err(UploadError::invalid_argument(format!(
            "Type {} not supported for dist {}.",
            artifact_type.as_str(),
            dist.as_str()
        )))
    }
}

/// Handle `PUT app`.
pub fn handle(services: &Services, request: &ApiRequest, body: &mut dyn Read) -> Result<Reply, ApiError> {
    tracing::info!(request_id = %request.request_id, "Put request for application received, authenticating");
    let context = SecurityContext::new(contexts::APPLICATION_PUT).map_err(|e| ApiError::from(&e))?;

    let mut release = None;
    let completed = services
        .orchestrator()
        .execute(&context, request, body, |signed| {
            let args = ReleaseArgs::parse(signed)?;
            let plan = UploadPlan {
                suffix: args.artifact_type.file_suffix().to_string(),
                checksum: args.checksum.clone(),
                channel: args.channel(),
                filename: args.filename.clone(),
                publisher: services.publisher_for(args.artifact_type),
            };
            release = Some(args);
            Ok(plan)
        })
        .map_err(|e| upload_failure(request, e))?;

    if let Some(args) = release {
        let entry = ReleaseEntry {
            dist: args.dist,
            artifact_type: args.artifact_type,
            app_version: args.version,
            date: args.date,
            release: !args.snapshot,
            os: args.os,
            arch: args.arch,
            checksum: completed.artifact.checksum.clone(),
            fullpath: completed.fullpath.clone(),
            recorded_at: Utc::now(),
        };
        // The artifact is already public; a missing index entry is not a failed upload.
        if let Err(e) = services.releases().record(entry) {
            tracing::error!(
                request_id = %request.request_id,
                fullpath = %completed.fullpath,
                error = %e,
                "Cannot record release"
            );
        }
    }

    Reply::ok(&UploadResponse {
        checksum: completed.artifact.checksum,
        channel: completed.channel,
        fullpath: completed.fullpath,
    })
}
