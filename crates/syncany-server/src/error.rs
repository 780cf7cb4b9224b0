//! Error taxonomy of the server core.
//!
//! Variants carry enough detail for server-side logs. None of that detail
//! reaches the client: conversion into [`ApiError`] maps every error onto a
//! fixed, generic message.

use std::io;
use std::path::PathBuf;

use syncany_protocol::ApiError;
use thiserror::Error;

/// Misconfiguration or filesystem anomaly. Reported to clients as a generic
/// server error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid security context name")]
    InvalidContext,

    #[error("no secret configured for security context '{0}'")]
    UnknownContext(String),

    #[error("secret record for security context '{0}' has no 'key' field")]
    MissingKey(String),

    #[error("invalid file suffix: {0:?}")]
    InvalidSuffix(String),

    #[error("invalid lock-in directory: {}", .0.display())]
    InvalidLockInDir(PathBuf),

    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("path {} escapes lock-in directory {}", .path.display(), .lock_dir.display())]
    ContainmentViolation { lock_dir: PathBuf, path: PathBuf },

    #[error("file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("target already exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether this error was raised by a lock-in containment check.
    pub fn is_containment_violation(&self) -> bool {
        matches!(self, Self::ContainmentViolation { .. })
    }
}

impl From<&ConfigError> for ApiError {
    fn from(_: &ConfigError) -> Self {
        ApiError::server_error()
    }
}

/// Authentication failure.
///
/// Deliberately carries no detail: missing fields, stale timestamps, unknown
/// contexts and signature mismatches are indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthError;

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        ApiError::unauthorized()
    }
}

/// Upload exceeded the size cap. The partial file is already removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("upload exceeds {max_bytes} bytes")]
pub struct OversizeError {
    pub max_bytes: u64,
}

impl From<OversizeError> for ApiError {
    fn from(e: OversizeError) -> Self {
        ApiError::payload_too_large(e.max_bytes)
    }
}

/// Computed digest differs from the claimed digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checksum mismatch: expected {expected}, got {actual}")]
pub struct ChecksumMismatchError {
    pub expected: String,
    pub actual: String,
}

impl From<&ChecksumMismatchError> for ApiError {
    fn from(_: &ChecksumMismatchError) -> Self {
        ApiError::checksum_mismatch()
    }
}

/// Errors from streaming content into a staging area.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error(transparent)]
    Oversize(#[from] OversizeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<&StagingError> for ApiError {
    fn from(e: &StagingError) -> Self {
        match e {
            StagingError::Oversize(e) => (*e).into(),
            StagingError::Config(e) => e.into(),
        }
    }
}
