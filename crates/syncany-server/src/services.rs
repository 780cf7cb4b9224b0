//! Components shared by all handlers, built once from the configuration.

use std::fs;
use std::sync::Arc;

use syncany_protocol::ops::ArtifactType;

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::keystore::KeyStore;
use crate::link_store::{JsonLinkStore, LinkStore};
use crate::publisher::{AptPublisher, DistDirectoryPublisher, Publisher, UnconfiguredAptPublisher};
use crate::release_index::{JsonReleaseIndex, ReleaseIndex};
use crate::signature::SignatureValidator;
use crate::staging::FileStaging;
use crate::upload::UploadOrchestrator;

/// Everything a request handler may use.
pub struct Services {
    config: ServerConfig,
    validator: SignatureValidator,
    staging: FileStaging,
    dist: DistDirectoryPublisher,
    apt: Option<AptPublisher>,
    releases: Box<dyn ReleaseIndex>,
    links: Box<dyn LinkStore>,
}

impl Services {
    /// Build all components from `config`, loading the key store.
    pub fn from_config(config: ServerConfig) -> Result<Self, ConfigError> {
        let keys = KeyStore::load(&config.keys_dir)?;
        Self::with_keys(config, keys)
    }

    /// Build all components with an already loaded key store.
    pub fn with_keys(config: ServerConfig, keys: KeyStore) -> Result<Self, ConfigError> {
        let staging = FileStaging::new(&config.upload_root, config.max_upload_bytes)?;
        fs::create_dir_all(&config.dist_root)
            .map_err(|e| ConfigError::io("create distribution root", &config.dist_root, e))?;

        let dist = DistDirectoryPublisher::new(&config.dist_root);
        let apt = config
            .apt
            .clone()
            .map(|apt| AptPublisher::new(apt, dist.clone()));

        Ok(Self {
            validator: SignatureValidator::new(Arc::new(keys), config.replay_window_seconds),
            staging,
            dist,
            apt,
            releases: Box::new(JsonReleaseIndex::new(&config.release_index_path)),
            links: Box::new(JsonLinkStore::new(&config.links_path)),
            config,
        })
    }

    /// Replace the release index.
    pub fn with_release_index(mut self, releases: impl ReleaseIndex + 'static) -> Self {
        self.releases = Box::new(releases);
        self
    }

    /// Replace the link store.
    pub fn with_link_store(mut self, links: impl LinkStore + 'static) -> Self {
        self.links = Box::new(links);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn validator(&self) -> &SignatureValidator {
        &self.validator
    }

    pub fn staging(&self) -> &FileStaging {
        &self.staging
    }

    pub fn orchestrator(&self) -> UploadOrchestrator<'_> {
        UploadOrchestrator::new(&self.validator, &self.staging)
    }

    pub fn releases(&self) -> &dyn ReleaseIndex {
        self.releases.as_ref()
    }

    pub fn links(&self) -> &dyn LinkStore {
        self.links.as_ref()
    }

    /// Publisher for plain distribution-directory uploads.
    pub fn dist_publisher(&self) -> &dyn Publisher {
        &self.dist
    }

    /// Publisher for an artifact type.
    pub fn publisher_for(&self, artifact_type: ArtifactType) -> &dyn Publisher {
        match (artifact_type, &self.apt) {
            (ArtifactType::Deb, Some(apt)) => apt,
            (ArtifactType::Deb, None) => &UnconfiguredAptPublisher,
            _ => &self.dist,
        }
    }
}
