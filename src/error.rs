//! Client errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no 'key' entry in {}", .0.display())]
    MissingKey(PathBuf),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write request: {0}")]
    Write(#[source] io::Error),
}
