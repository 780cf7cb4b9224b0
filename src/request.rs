//! Building and framing API requests.
//!
//! A framed request is one JSON header line followed, for uploads, by exactly
//! `body_length` raw bytes.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use syncany_protocol::ops::{
    resources, verbs, Architecture, ArtifactType, Dist, OperatingSystem, ARG_LINK,
};
use syncany_protocol::{ApiRequest, Method};

use crate::error::ClientError;
use crate::signer::RequestSigner;

/// Fresh request id.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Lowercase hex SHA-256 of a file.
pub fn file_checksum(path: &Path) -> Result<String, ClientError> {
    let read_err = |source| ClientError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_err)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Write a header line and an optional body.
pub fn write_framed<W: Write>(
    writer: &mut W,
    request: &ApiRequest,
    body: Option<&mut dyn Read>,
) -> Result<(), ClientError> {
    let header = serde_json::to_string(request)?;
    writeln!(writer, "{}", header).map_err(ClientError::Write)?;

    if let Some(body) = body {
        io::copy(body, writer).map_err(ClientError::Write)?;
    }
    writer.flush().map_err(ClientError::Write)
}

/// Metadata of an application release upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMetadata {
    pub filename: String,
    pub version: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub snapshot: bool,
    pub os: OperatingSystem,
    pub arch: Architecture,
    pub dist: Dist,
    pub artifact_type: ArtifactType,
}

/// A file upload request, ready to be signed and framed.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    request: ApiRequest,
    path: PathBuf,
}

impl UploadRequest {
    /// `PUT app` for a release file.
    pub fn release(path: &Path, metadata: &ReleaseMetadata) -> Result<Self, ClientError> {
        let request = ApiRequest::new(new_request_id(), Method::Put, resources::APP)
            .with_arg("filename", &metadata.filename)
            .with_arg("version", &metadata.version)
            .with_arg("date", &metadata.date)
            .with_arg("snapshot", metadata.snapshot.to_string())
            .with_arg("os", metadata.os.as_str())
            .with_arg("arch", metadata.arch.as_str())
            .with_arg("dist", metadata.dist.as_str())
            .with_arg("type", metadata.artifact_type.as_str());

        Self::for_file(request, path)
    }

    /// `PUT app/osxnotifier` for a notifier bundle.
    pub fn osx_notifier(path: &Path, filename: &str, snapshot: bool) -> Result<Self, ClientError> {
        let request = ApiRequest::new(new_request_id(), Method::Put, resources::APP)
            .with_verb(verbs::OSX_NOTIFIER)
            .with_arg("filename", filename)
            .with_arg("snapshot", snapshot.to_string());

        Self::for_file(request, path)
    }

    fn for_file(mut request: ApiRequest, path: &Path) -> Result<Self, ClientError> {
        let metadata = std::fs::metadata(path).map_err(|source| ClientError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(ClientError::InvalidArgument(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        request.args.insert("checksum".to_string(), file_checksum(path)?);
        request.body_length = Some(metadata.len());

        Ok(Self {
            request,
            path: path.to_path_buf(),
        })
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn sign(&mut self, signer: &RequestSigner) {
        signer.sign(&mut self.request);
    }

    /// Write the header line followed by the file content.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ClientError> {
        let mut file = File::open(&self.path).map_err(|source| ClientError::Read {
            path: self.path.clone(),
            source,
        })?;
        write_framed(writer, &self.request, Some(&mut file))
    }
}

/// `POST links/add` for a long link.
pub fn link_add_request(long_link: &str) -> ApiRequest {
    ApiRequest::new(new_request_id(), Method::Post, resources::LINKS)
        .with_verb(verbs::ADD)
        .with_arg(ARG_LINK, long_link)
}

/// `GET links` for a short link id.
pub fn link_get_request(short_link_id: &str) -> ApiRequest {
    ApiRequest::new(new_request_id(), Method::Get, resources::LINKS).with_path_arg(short_link_id)
}
