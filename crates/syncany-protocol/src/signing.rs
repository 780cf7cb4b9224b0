//! Request signing.
//!
//! Every authenticated request carries three extra arguments: `time` (Unix
//! seconds), `rand` (an opaque nonce) and `signature`, the lowercase hex
//! HMAC-SHA256 of the canonical string under the security context's secret:
//!
//! ```text
//! METHOD ":" resource ["/" verb] ["/" path_args...] ":" query ":" time ":" rand
//! ```
//!
//! `query` is the form-urlencoded list of all remaining arguments, sorted by
//! key, so signer and verifier agree byte-for-byte regardless of the order in
//! which the transport delivered them.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::request::{ApiRequest, Method};

/// Argument carrying the hex signature.
pub const ARG_SIGNATURE: &str = "signature";

/// Argument carrying the Unix timestamp.
pub const ARG_TIME: &str = "time";

/// Argument carrying the nonce.
pub const ARG_RAND: &str = "rand";

type HmacSha256 = Hmac<Sha256>;

/// Problems extracting the signing fields from a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningFieldError {
    #[error("missing argument: {0}")]
    Missing(&'static str),

    #[error("time argument is not an integer")]
    InvalidTime,
}

fn is_auth_arg(key: &str) -> bool {
    key == ARG_SIGNATURE || key == ARG_TIME || key == ARG_RAND
}

/// Build the canonical string for a request.
///
/// Authentication arguments in `args` are ignored; they are bound through
/// `timestamp` and `nonce` instead.
pub fn canonical_string(
    method: Method,
    resource: &str,
    verb: Option<&str>,
    path_args: &[String],
    args: &BTreeMap<String, String>,
    timestamp: i64,
    nonce: &str,
) -> String {
    let mut path = resource.to_string();
    if let Some(verb) = verb {
        path.push('/');
        path.push_str(verb);
    }
    if !path_args.is_empty() {
        path.push('/');
        path.push_str(&path_args.join("/"));
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(args.iter().filter(|(k, _)| !is_auth_arg(k)))
        .finish();

    format!("{}:{}:{}:{}:{}", method.as_str(), path, query, timestamp, nonce)
}

/// Compute the lowercase hex HMAC-SHA256 of `canonical` under `secret`.
pub fn compute_signature(secret: &[u8], canonical: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sign a request in place.
///
/// Any existing `time`, `rand` and `signature` arguments are replaced.
pub fn sign_request(request: &mut ApiRequest, secret: &[u8], timestamp: i64, nonce: &str) {
    request.args.retain(|k, _| !is_auth_arg(k));

    let canonical = canonical_string(
        request.method,
        &request.resource,
        request.verb.as_deref(),
        &request.path_args,
        &request.args,
        timestamp,
        nonce,
    );
    let signature = compute_signature(secret, &canonical);

    request.args.insert(ARG_TIME.to_string(), timestamp.to_string());
    request.args.insert(ARG_RAND.to_string(), nonce.to_string());
    request.args.insert(ARG_SIGNATURE.to_string(), signature);
}

/// An authenticated request, split into payload and signing fields.
///
/// Immutable once built; the canonical string is a pure function of its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    method: Method,
    resource: String,
    verb: Option<String>,
    path_args: Vec<String>,
    args: BTreeMap<String, String>,
    timestamp: i64,
    nonce: String,
    signature: String,
}

impl SignedRequest {
    /// Build from explicit parts. Authentication keys in `args` are dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        method: Method,
        resource: impl Into<String>,
        verb: Option<String>,
        path_args: Vec<String>,
        mut args: BTreeMap<String, String>,
        timestamp: i64,
        nonce: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        args.retain(|k, _| !is_auth_arg(k));
        Self {
            method,
            resource: resource.into(),
            verb,
            path_args,
            args,
            timestamp,
            nonce: nonce.into(),
            signature: signature.into(),
        }
    }

    /// Extract the signing fields from an envelope.
    pub fn from_request(request: &ApiRequest) -> Result<Self, SigningFieldError> {
        let signature = request
            .arg(ARG_SIGNATURE)
            .ok_or(SigningFieldError::Missing(ARG_SIGNATURE))?;
        let time = request
            .arg(ARG_TIME)
            .ok_or(SigningFieldError::Missing(ARG_TIME))?;
        let nonce = request
            .arg(ARG_RAND)
            .ok_or(SigningFieldError::Missing(ARG_RAND))?;

        let timestamp = time
            .trim()
            .parse::<i64>()
            .map_err(|_| SigningFieldError::InvalidTime)?;

        Ok(Self::new(
            request.method,
            request.resource.clone(),
            request.verb.clone(),
            request.path_args.clone(),
            request.args.clone(),
            timestamp,
            nonce,
            signature,
        ))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    /// Signed arguments, without `signature`, `time` and `rand`.
    pub fn args(&self) -> &BTreeMap<String, String> {
        &self.args
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Claimed signature as sent by the client.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The canonical string this request must have been signed over.
    pub fn canonical_string(&self) -> String {
        canonical_string(
            self.method,
            &self.resource,
            self.verb.as_deref(),
            &self.path_args,
            &self.args,
            self.timestamp,
            &self.nonce,
        )
    }
}
