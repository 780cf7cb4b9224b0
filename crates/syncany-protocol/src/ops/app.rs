//! Application release operation types (`app` resource).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distribution of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dist {
    Cli,
    Gui,
    Other,
}

impl Dist {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Gui => "gui",
            Self::Other => "other",
        }
    }
}

impl FromStr for Dist {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cli" => Ok(Self::Cli),
            "gui" => Ok(Self::Gui),
            "other" => Ok(Self::Other),
            other => Err(format!("invalid dist: {}", other)),
        }
    }
}

/// File type of an uploaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactType {
    #[serde(rename = "tar.gz")]
    TarGz,
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "deb")]
    Deb,
    #[serde(rename = "exe")]
    Exe,
    #[serde(rename = "app.zip")]
    AppZip,
    #[serde(rename = "docs")]
    Docs,
    #[serde(rename = "reports")]
    Reports,
}

impl ArtifactType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
            Self::Deb => "deb",
            Self::Exe => "exe",
            Self::AppZip => "app.zip",
            Self::Docs => "docs",
            Self::Reports => "reports",
        }
    }

    /// Suffix given to the staged temporary file.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::TarGz => ".tar.gz",
            Self::Zip | Self::Docs | Self::Reports => ".zip",
            Self::Deb => ".deb",
            Self::Exe => ".exe",
            Self::AppZip => ".app.zip",
        }
    }

    /// Whether this type is a downloadable release (as opposed to docs/reports).
    pub fn is_release(self) -> bool {
        !matches!(self, Self::Docs | Self::Reports)
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tar.gz" => Ok(Self::TarGz),
            "zip" => Ok(Self::Zip),
            "deb" => Ok(Self::Deb),
            "exe" => Ok(Self::Exe),
            "app.zip" => Ok(Self::AppZip),
            "docs" => Ok(Self::Docs),
            "reports" => Ok(Self::Reports),
            other => Err(format!("invalid type: {}", other)),
        }
    }
}

/// Target operating system of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    All,
    Linux,
    Windows,
    Macosx,
}

impl OperatingSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Macosx => "macosx",
        }
    }
}

impl FromStr for OperatingSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            "macosx" => Ok(Self::Macosx),
            other => Err(format!("invalid os: {}", other)),
        }
    }
}

/// Target architecture of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "x86")]
    X86,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Architecture {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
        }
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "x86" => Ok(Self::X86),
            "x86_64" => Ok(Self::X86_64),
            other => Err(format!("invalid arch: {}", other)),
        }
    }
}

/// Publication channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Release,
    Snapshot,
}

impl Channel {
    /// Channel for an upload flagged (or not) as snapshot.
    pub fn from_snapshot(snapshot: bool) -> Self {
        if snapshot {
            Self::Snapshot
        } else {
            Self::Release
        }
    }

    /// Identifier passed to publishers (APT codename).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Snapshot => "snapshot",
        }
    }

    /// Directory below the distribution root.
    pub fn dist_dir(self) -> &'static str {
        match self {
            Self::Release => "releases",
            Self::Snapshot => "snapshots",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response payload of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Verified SHA-256 of the uploaded content.
    pub checksum: String,
    /// Channel the artifact was published to.
    pub channel: Channel,
    /// Public path below the download base URL.
    pub fullpath: String,
}

/// One published release, as returned by `GET app`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub dist: Dist,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub app_version: String,
    pub date: String,
    pub release: bool,
    pub os: OperatingSystem,
    pub arch: Architecture,
    pub checksum: String,
    pub download_url: String,
}

/// Response payload of `GET app`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestReleasesResponse {
    pub releases: Vec<ReleaseInfo>,
}
