//! Request signature validation.
//!
//! A request is authentic when its `signature` argument equals the HMAC-SHA256
//! of its canonical string under the secret of the operation's security
//! context, and fresh when its `time` argument lies within the replay window
//! around the server clock (inclusive on both sides).
//!
//! The `rand` nonce is bound into the signature but not checked for reuse, so
//! a captured request can be replayed until its timestamp leaves the window.

use std::sync::Arc;

use chrono::Utc;
use subtle::ConstantTimeEq;
use syncany_protocol::{compute_signature, ApiRequest, SignedRequest};

use crate::context::SecurityContext;
use crate::error::AuthError;
use crate::keystore::KeyStore;

/// Verifies signed requests against the key store.
#[derive(Debug, Clone)]
pub struct SignatureValidator {
    keys: Arc<KeyStore>,
    replay_window_seconds: u64,
}

impl SignatureValidator {
    pub fn new(keys: Arc<KeyStore>, replay_window_seconds: u64) -> Self {
        Self {
            keys,
            replay_window_seconds,
        }
    }

    pub fn replay_window_seconds(&self) -> u64 {
        self.replay_window_seconds
    }

    /// Authenticate a request envelope against the current server time.
    pub fn validate(
        &self,
        context: &SecurityContext,
        request: &ApiRequest,
    ) -> Result<SignedRequest, AuthError> {
        self.validate_at(context, request, Utc::now().timestamp())
    }

    /// Authenticate a request envelope against the given server time.
    pub fn validate_at(
        &self,
        context: &SecurityContext,
        request: &ApiRequest,
        now: i64,
    ) -> Result<SignedRequest, AuthError> {
        let signed = SignedRequest::from_request(request).map_err(|e| {
            tracing::warn!(context = %context, reason = %e, "Rejecting request with invalid signing fields");
            AuthError
        })?;

        self.verify(context, &signed, now)?;
        Ok(signed)
    }

    /// Verify freshness and signature of an already split request.
    pub fn verify(
        &self,
        context: &SecurityContext,
        signed: &SignedRequest,
        now: i64,
    ) -> Result<(), AuthError> {
        if !self.is_fresh(signed.timestamp(), now) {
            tracing::warn!(context = %context, time = signed.timestamp(), now, "Request time not in allowed range");
            return Err(AuthError);
        }

        let secret = self.keys.get_secret(context).map_err(|e| {
            tracing::error!(context = %context, error = %e, "Cannot read secret for security context");
            AuthError
        })?;

        let canonical = signed.canonical_string();
        tracing::debug!(context = %context, canonical = %canonical, "Protected input");

        let expected = compute_signature(secret.as_bytes(), &canonical);
        let matches: bool = expected.as_bytes().ct_eq(signed.signature().as_bytes()).into();
        if !matches {
            tracing::warn!(context = %context, "Given signature does not match expected signature");
            return Err(AuthError);
        }

        tracing::info!(context = %context, "Authentication successful");
        Ok(())
    }

    /// Whether `|now - timestamp| <= window`.
    pub fn is_fresh(&self, timestamp: i64, now: i64) -> bool {
        let skew = (i128::from(now) - i128::from(timestamp)).unsigned_abs();
        skew <= u128::from(self.replay_window_seconds)
    }
}
