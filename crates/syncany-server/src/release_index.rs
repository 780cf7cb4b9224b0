//! Record of published releases and the "latest release" query.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syncany_protocol::ops::{Architecture, ArtifactType, Dist, OperatingSystem, ReleaseInfo};

use crate::store::{self, IndexError};

/// One published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub dist: Dist,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub app_version: String,
    /// Release date, `YYYY-MM-DD`.
    pub date: String,
    /// `false` for snapshots.
    pub release: bool,
    pub os: OperatingSystem,
    pub arch: Architecture,
    pub checksum: String,
    /// Public path below the download base URL.
    pub fullpath: String,
    pub recorded_at: DateTime<Utc>,
}

impl ReleaseEntry {
    /// Wire representation with an absolute download URL.
    pub fn to_info(&self, base_url: &str) -> ReleaseInfo {
        ReleaseInfo {
            dist: self.dist,
            artifact_type: self.artifact_type,
            app_version: self.app_version.clone(),
            date: self.date.clone(),
            release: self.release,
            os: self.os,
            arch: self.arch,
            checksum: self.checksum.clone(),
            download_url: format!("{}{}", base_url, self.fullpath),
        }
    }
}

/// Filters of the latest-release query. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseQuery {
    pub dist: Option<Dist>,
    pub artifact_type: Option<ArtifactType>,
    pub os: Option<OperatingSystem>,
    pub arch: Option<Architecture>,
    pub include_snapshots: bool,
}

impl ReleaseQuery {
    /// Whether an entry passes the filters.
    ///
    /// An `os`/`arch` filter also matches entries recorded for `all`, and a
    /// filter value of `all` matches every entry.
    pub fn matches(&self, entry: &ReleaseEntry) -> bool {
        self.dist.map_or(true, |d| entry.dist == d)
            && self.artifact_type.map_or(true, |t| entry.artifact_type == t)
            && self.os.map_or(true, |os| {
                os == OperatingSystem::All || entry.os == OperatingSystem::All || entry.os == os
            })
            && self.arch.map_or(true, |arch| {
                arch == Architecture::All || entry.arch == Architecture::All || entry.arch == arch
            })
            && (self.include_snapshots || entry.release)
    }
}

/// Latest matching entry per (dist, type, os, arch), in key order.
///
/// "Latest" is the entry recorded last; `entries` is in recording order.
pub fn latest_matching(entries: &[ReleaseEntry], query: &ReleaseQuery) -> Vec<ReleaseEntry> {
    let mut latest: BTreeMap<(Dist, ArtifactType, OperatingSystem, Architecture), &ReleaseEntry> =
        BTreeMap::new();

    for entry in entries.iter().filter(|e| query.matches(e)) {
        latest.insert((entry.dist, entry.artifact_type, entry.os, entry.arch), entry);
    }

    latest.into_values().cloned().collect()
}

/// Storage of release entries.
pub trait ReleaseIndex {
    /// Append an entry.
    fn record(&self, entry: ReleaseEntry) -> Result<(), IndexError>;

    /// All entries in recording order.
    fn entries(&self) -> Result<Vec<ReleaseEntry>, IndexError>;

    fn latest(&self, query: &ReleaseQuery) -> Result<Vec<ReleaseEntry>, IndexError> {
        Ok(latest_matching(&self.entries()?, query))
    }
}

/// Release index kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonReleaseIndex {
    path: PathBuf,
}

impl JsonReleaseIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReleaseIndex for JsonReleaseIndex {
    fn record(&self, entry: ReleaseEntry) -> Result<(), IndexError> {
        let mut entries = self.entries()?;
        tracing::debug!(
            dist = entry.dist.as_str(),
            artifact_type = entry.artifact_type.as_str(),
            version = %entry.app_version,
            "Recording release"
        );
        entries.push(entry);
        store::write_json_atomic(&self.path, &entries)
    }

    fn entries(&self) -> Result<Vec<ReleaseEntry>, IndexError> {
        store::read_json(&self.path)
    }
}
