//! Short link storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syncany_protocol::random_alphanumeric;

use crate::store::{self, IndexError};

/// Length of generated short link ids.
pub const SHORT_LINK_ID_LEN: usize = 7;

/// Collision retries before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

/// A stored long link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub long_link: String,
    pub created_at: DateTime<Utc>,
}

/// Storage of short links.
pub trait LinkStore {
    /// Store a long link under a fresh id and return the id.
    fn add(&self, long_link: &str) -> Result<String, IndexError>;

    /// Look up the long link of an id.
    fn resolve(&self, short_link_id: &str) -> Result<Option<String>, IndexError>;
}

/// Link store kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonLinkStore {
    path: PathBuf,
}

impl JsonLinkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, LinkRecord>, IndexError> {
        store::read_json(&self.path)
    }
}

impl LinkStore for JsonLinkStore {
    fn add(&self, long_link: &str) -> Result<String, IndexError> {
        let mut links = self.load()?;

        let id = (0..MAX_ID_ATTEMPTS)
            .map(|_| random_alphanumeric(SHORT_LINK_ID_LEN))
            .find(|id| !links.contains_key(id))
            .ok_or(IndexError::IdExhausted(MAX_ID_ATTEMPTS))?;

        links.insert(
            id.clone(),
            LinkRecord {
                long_link: long_link.to_string(),
                created_at: Utc::now(),
            },
        );
        store::write_json_atomic(&self.path, &links)?;

        tracing::info!(short_link_id = %id, "Short link created");
        Ok(id)
    }

    fn resolve(&self, short_link_id: &str) -> Result<Option<String>, IndexError> {
        Ok(self.load()?.remove(short_link_id).map(|r| r.long_link))
    }
}
