//! Server configuration.
//!
//! Loaded once from a TOML file and passed explicitly into every component.
//! Missing fields fall back to [`ServerConfig::default`]:
//!
//! ```toml
//! upload_root = "/var/lib/syncany-api/upload"
//! keys_dir = "/etc/syncany-api/keys"
//! dist_root = "/var/www/get.syncany.org/dist"
//! base_url = "https://get.syncany.org/dist"
//! replay_window_seconds = 180
//!
//! [apt]
//! gnupg_home = "/etc/syncany-api/gnupg"
//! release_repo = "/var/www/get.syncany.org/apt/release"
//! snapshot_repo = "/var/www/get.syncany.org/apt/snapshot"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use syncany_protocol::ops::Channel;
use syncany_protocol::{DEFAULT_REPLAY_WINDOW_SECONDS, MAX_UPLOAD_BYTES};
use thiserror::Error;

/// Errors loading or validating the configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Lock-in directory for all staging areas.
    pub upload_root: PathBuf,
    /// Directory holding one `<context>.properties` secret record per context.
    pub keys_dir: PathBuf,
    /// Public distribution directory (lock-in directory of published files).
    pub dist_root: PathBuf,
    /// Download URL prefix; a release's URL is `base_url + fullpath`.
    pub base_url: String,
    /// Allowed clock skew of signed requests, in seconds (inclusive).
    pub replay_window_seconds: u64,
    /// Maximum upload size in bytes.
    pub max_upload_bytes: u64,
    /// JSON file recording published releases.
    pub release_index_path: PathBuf,
    /// JSON file recording short links.
    pub links_path: PathBuf,
    /// APT repository settings. `deb` uploads are refused without them.
    pub apt: Option<AptConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from("/var/lib/syncany-api/upload"),
            keys_dir: PathBuf::from("/etc/syncany-api/keys"),
            dist_root: PathBuf::from("/var/www/get.syncany.org/dist"),
            base_url: "https://get.syncany.org/dist".to_string(),
            replay_window_seconds: DEFAULT_REPLAY_WINDOW_SECONDS,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            release_index_path: PathBuf::from("/var/lib/syncany-api/releases.json"),
            links_path: PathBuf::from("/var/lib/syncany-api/links.json"),
            apt: None,
        }
    }
}

impl ServerConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without validation.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Check settings that would otherwise only fail at request time.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, path) in [
            ("upload_root", &self.upload_root),
            ("dist_root", &self.dist_root),
        ] {
            if !path.is_absolute() || path.parent().is_none() {
                return Err(SettingsError::Invalid(format!(
                    "{} must be an absolute directory other than /",
                    name
                )));
            }
        }

        if self.upload_root.starts_with(&self.dist_root) || self.dist_root.starts_with(&self.upload_root) {
            return Err(SettingsError::Invalid(
                "upload_root and dist_root must not contain each other".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 || self.max_upload_bytes > MAX_UPLOAD_BYTES {
            return Err(SettingsError::Invalid(format!(
                "max_upload_bytes must be between 1 and {}",
                MAX_UPLOAD_BYTES
            )));
        }

        if let Some(apt) = &self.apt {
            if apt.program.trim().is_empty() {
                return Err(SettingsError::Invalid("apt.program must not be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Settings of the reprepro-managed APT repositories.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AptConfig {
    /// Repository tool to run.
    #[serde(default = "default_apt_program")]
    pub program: String,
    /// GnuPG home used to sign repository metadata.
    pub gnupg_home: PathBuf,
    /// Repository base directory for the `release` codename.
    pub release_repo: PathBuf,
    /// Repository base directory for the `snapshot` codename.
    pub snapshot_repo: PathBuf,
}

fn default_apt_program() -> String {
    "reprepro".to_string()
}

impl AptConfig {
    /// Repository base directory for a channel.
    pub fn repo_for(&self, channel: Channel) -> &Path {
        match channel {
            Channel::Release => &self.release_repo,
            Channel::Snapshot => &self.snapshot_repo,
        }
    }
}
