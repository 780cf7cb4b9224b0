//! Upload orchestration.
//!
//! authenticate → parse arguments → stage → verify checksum → publish.
//!
//! Nothing touches the filesystem before the signature is verified. The
//! staging area lives for the duration of one [`UploadOrchestrator::execute`]
//! call and is torn down on every exit path: after publication it is empty,
//! after a rejection the artifact is deleted first.

use std::io::Read;

use syncany_protocol::ops::Channel;
use syncany_protocol::{ApiError, ApiRequest, SignedRequest};
use thiserror::Error;

use crate::context::SecurityContext;
use crate::error::{AuthError, ChecksumMismatchError, ConfigError, OversizeError, StagingError};
use crate::publisher::{PublishError, Publisher};
use crate::signature::SignatureValidator;
use crate::staging::{FileStaging, PublishedArtifact, VerifyError};

/// Errors of an upload, in the order the steps run.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Oversize(#[from] OversizeError),

    #[error(transparent)]
    ChecksumMismatch(#[from] ChecksumMismatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl UploadError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<StagingError> for UploadError {
    fn from(e: StagingError) -> Self {
        match e {
            StagingError::Oversize(e) => Self::Oversize(e),
            StagingError::Config(e) => Self::Config(e),
        }
    }
}

impl From<VerifyError> for UploadError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::Mismatch(e) => Self::ChecksumMismatch(e),
            VerifyError::Config(e) => Self::Config(e),
        }
    }
}

impl From<&UploadError> for ApiError {
    fn from(e: &UploadError) -> Self {
        match e {
            UploadError::Auth(e) => (*e).into(),
            UploadError::InvalidArgument(message) => ApiError::invalid_request(message.clone()),
            UploadError::Oversize(e) => (*e).into(),
            UploadError::ChecksumMismatch(e) => e.into(),
            UploadError::Config(e) => e.into(),
            UploadError::Publish(_) => ApiError::server_error(),
        }
    }
}

/// What to do with an authenticated upload.
pub struct UploadPlan<'p> {
    /// Suffix of the staged file (`[.A-Za-z0-9]*`).
    pub suffix: String,
    /// Claimed SHA-256 of the content.
    pub checksum: String,
    pub channel: Channel,
    /// Public file name.
    pub filename: String,
    pub publisher: &'p dyn Publisher,
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    pub artifact: PublishedArtifact,
    pub channel: Channel,
    /// Public path below the download base URL.
    pub fullpath: String,
}

/// Drives an upload through authentication, staging and publication.
pub struct UploadOrchestrator<'a> {
    validator: &'a SignatureValidator,
    staging: &'a FileStaging,
}

impl<'a> UploadOrchestrator<'a> {
    pub fn new(validator: &'a SignatureValidator, staging: &'a FileStaging) -> Self {
        Self { validator, staging }
    }

    /// Run one upload.
    ///
    /// `plan` parses the authenticated arguments and picks the publisher; it
    /// runs after signature verification and before anything is written.
    pub fn execute<'p, R, F>(
        &self,
        context: &SecurityContext,
        request: &ApiRequest,
        body: R,
        plan: F,
    ) -> Result<CompletedUpload, UploadError>
    where
        R: Read,
        F: FnOnce(&SignedRequest) -> Result<UploadPlan<'p>, UploadError>,
    {
        let signed = self.validator.validate(context, request)?;
        let plan = plan(&signed)?;

        let area = self.staging.create_staging_area(context)?;
        let staged = self.staging.write_stream(body, &area, &plan.suffix)?;
        tracing::info!(
            request_id = %request.request_id,
            context = %context,
            bytes = staged.len(),
            "Upload staged, verifying checksum"
        );

        let verified = staged.verify(&plan.checksum)?;

        let publication = match plan.publisher.publish(&verified, plan.channel, &plan.filename) {
            Ok(publication) => publication,
            Err(e) => {
                tracing::error!(request_id = %request.request_id, error = %e, "Publishing failed, rejecting upload");
                if let Err(cleanup) = verified.reject() {
                    tracing::error!(error = %cleanup, "Cannot delete rejected upload");
                }
                return Err(e.into());
            }
        };

        let artifact = verified.publish(publication.location);
        if let Err(e) = area.remove() {
            tracing::error!(request_id = %request.request_id, error = %e, "Cannot remove staging area");
        }

        tracing::info!(
            request_id = %request.request_id,
            channel = %plan.channel,
            fullpath = %publication.fullpath,
            "Upload published"
        );
        Ok(CompletedUpload {
            artifact,
            channel: plan.channel,
            fullpath: publication.fullpath,
        })
    }
}
