//! Request signing.

use std::fs;
use std::path::Path;

use chrono::Utc;
use syncany_protocol::keys::record_secret;
use syncany_protocol::signing::sign_request;
use syncany_protocol::{canonical_string, compute_signature, random_alphanumeric, ApiRequest};

use crate::error::ClientError;

/// Length of generated nonces.
pub const NONCE_LEN: usize = 7;

/// Signs requests with the secret of one security context.
pub struct RequestSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Read the secret from a `key = value` record file (the `key` entry).
    pub fn from_key_file(path: &Path) -> Result<Self, ClientError> {
        let text = fs::read_to_string(path).map_err(|source| ClientError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let secret =
            record_secret(&text).ok_or_else(|| ClientError::MissingKey(path.to_path_buf()))?;

        Ok(Self::new(secret))
    }

    /// Sign with the current time and a fresh nonce.
    pub fn sign(&self, request: &mut ApiRequest) {
        self.sign_at(request, Utc::now().timestamp(), &random_nonce());
    }

    /// Sign with a given time and nonce.
    pub fn sign_at(&self, request: &mut ApiRequest, timestamp: i64, nonce: &str) {
        sign_request(request, &self.secret, timestamp, nonce);
    }

    /// Canonical string and signature for a request, without modifying it.
    pub fn explain(&self, request: &ApiRequest, timestamp: i64, nonce: &str) -> (String, String) {
        let canonical = canonical_string(
            request.method,
            &request.resource,
            request.verb.as_deref(),
            &request.path_args,
            &request.args,
            timestamp,
            nonce,
        );
        let signature = compute_signature(&self.secret, &canonical);
        (canonical, signature)
    }
}

/// Random alphanumeric nonce.
pub fn random_nonce() -> String {
    random_alphanumeric(NONCE_LEN)
}
