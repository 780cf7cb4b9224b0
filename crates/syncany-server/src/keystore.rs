//! Per-context shared secrets.
//!
//! Each security context has one record file `<keys_dir>/<context>.properties`
//! in `key = value` format; the value under `key` is the HMAC secret:
//!
//! ```text
//! # application uploads from the build server
//! key = 1f0c...
//! ```
//!
//! All records are read once when the store is built. The store is immutable
//! afterwards and can be shared freely between request handlers.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use syncany_protocol::keys::{record_secret, RECORD_EXTENSION};

use crate::context::SecurityContext;
use crate::error::ConfigError;

/// An HMAC secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Read-only map from security context to secret.
#[derive(Debug, Default)]
pub struct KeyStore {
    records: HashMap<SecurityContext, Option<Secret>>,
}

impl KeyStore {
    /// Load every `*.properties` record in `keys_dir`.
    ///
    /// Files whose stem is not a valid context name are ignored.
    pub fn load(keys_dir: &Path) -> Result<Self, ConfigError> {
        let entries =
            fs::read_dir(keys_dir).map_err(|e| ConfigError::io("read keys directory", keys_dir, e))?;

        let mut records = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::io("read keys directory", keys_dir, e))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let context = match SecurityContext::new(stem) {
                Ok(context) => context,
                Err(_) => {
                    tracing::warn!(file = %path.display(), "Ignoring key record with invalid context name");
                    continue;
                }
            };

            let text = fs::read_to_string(&path).map_err(|e| ConfigError::io("read key record", &path, e))?;
            let secret = record_secret(&text).map(Secret::new);

            records.insert(context, secret);
        }

        tracing::debug!(contexts = records.len(), "Key store loaded");
        Ok(Self { records })
    }

    /// Build a store from in-memory secrets.
    pub fn from_secrets<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = (SecurityContext, S)>,
        S: Into<Vec<u8>>,
    {
        Self {
            records: secrets
                .into_iter()
                .map(|(context, secret)| (context, Some(Secret::new(secret))))
                .collect(),
        }
    }

    /// Resolve the secret for a context.
    pub fn get_secret(&self, context: &SecurityContext) -> Result<&Secret, ConfigError> {
        match self.records.get(context) {
            Some(Some(secret)) => Ok(secret),
            Some(None) => Err(ConfigError::MissingKey(context.to_string())),
            None => Err(ConfigError::UnknownContext(context.to_string())),
        }
    }

    /// Names of all configured contexts, sorted.
    pub fn contexts(&self) -> Vec<&SecurityContext> {
        let mut contexts: Vec<_> = self.records.keys().collect();
        contexts.sort();
        contexts
    }
}
