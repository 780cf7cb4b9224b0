//! JSON file persistence shared by the release index and the link store.
//!
//! Files are rewritten as a whole: serialize to a temporary sibling, then
//! rename over the original. Readers never observe a partially written file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use syncany_protocol::{random_alphanumeric, ApiError};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt store file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot allocate a unique id after {0} attempts")]
    IdExhausted(usize),
}

impl IndexError {
    fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<&IndexError> for ApiError {
    fn from(_: &IndexError) -> Self {
        ApiError::server_error()
    }
}

/// Read a JSON document, or `T::default()` if the file does not exist yet.
pub(crate) fn read_json<T>(path: &Path) -> Result<T, IndexError>
where
    T: DeserializeOwned + Default,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(IndexError::io("read", path, e)),
    };

    serde_json::from_slice(&bytes).map_err(|source| IndexError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with the JSON serialization of `value`.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), IndexError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| IndexError::io("create directory", parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, random_alphanumeric(8)));

    let result = write_file(&temp_path, value).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|e| IndexError::io("rename", path, e))
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_file<T: Serialize>(path: &Path, value: &T) -> Result<(), IndexError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| IndexError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    let mut file = fs::File::create(path).map_err(|e| IndexError::io("create", path, e))?;
    file.write_all(&json)
        .and_then(|()| file.write_all(b"\n"))
        .and_then(|()| file.sync_all())
        .map_err(|e| IndexError::io("write", path, e))
}
