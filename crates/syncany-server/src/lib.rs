//! Syncany API server.
//!
//! Receives signed release uploads and link-shortener requests, stages
//! untrusted upload content in a sandbox below the upload root and publishes
//! verified artifacts to the distribution directory.

pub mod checksum;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod keystore;
pub mod link_store;
pub mod logging;
pub mod publisher;
pub mod release_index;
pub mod rpc;
pub mod services;
pub mod signature;
pub mod staging;
pub mod store;
pub mod upload;
pub mod validate;

pub use config::{AptConfig, ServerConfig, SettingsError};
pub use context::SecurityContext;
pub use error::{AuthError, ChecksumMismatchError, ConfigError, OversizeError, StagingError};
pub use keystore::KeyStore;
pub use rpc::RpcHandler;
pub use services::Services;
pub use signature::SignatureValidator;
pub use staging::FileStaging;
pub use upload::{UploadError, UploadOrchestrator};
