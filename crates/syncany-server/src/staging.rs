//! Sandboxed staging of untrusted uploads.
//!
//! Uploads are streamed into a fresh staging area
//! `<upload_root>/<context>/<unix_time>-<random7>` and only leave it through
//! [`move_into`]. Every path operation is first checked against a lock-in
//! directory ([`check_lock_in`]):
//!
//! - the lock-in directory must be an absolute, existing directory other than `/`
//! - the path must lie strictly below it, component-wise, without `..`
//! - for paths that must exist, the symlink-resolved path is checked again
//! - for paths that must not exist, the resolved parent is checked again
//!
//! A [`StagingArea`] deletes its directory tree when dropped, so partial or
//! rejected uploads never outlive the request, whatever path the request takes
//! out of the orchestrator.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use syncany_protocol::random_alphanumeric;
use walkdir::WalkDir;

use crate::checksum;
use crate::context::SecurityContext;
use crate::error::{ChecksumMismatchError, ConfigError, OversizeError, StagingError};
use crate::validate;

/// Chunk size used when streaming uploads to disk.
pub const STREAM_CHUNK_BYTES: usize = 8 * 1024;

/// Length of the random part of a staging directory name.
const AREA_RANDOM_LEN: usize = 7;

/// Length of the random part of a staged file name.
const FILE_RANDOM_LEN: usize = 5;

/// Existence requirement of a lock-in check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    /// The path must exist; its resolved form must also be inside.
    MustExist,
    /// The path must not exist; its resolved parent must be inside.
    MustNotExist,
}

/// Verify that `path` resides inside `lock_dir`.
pub fn check_lock_in(lock_dir: &Path, path: &Path, existence: Existence) -> Result<(), ConfigError> {
    let resolved_lock_dir = resolve_lock_dir(lock_dir)?;

    match existence {
        Existence::MustExist => {
            ensure_below(lock_dir, path, false)?;
            let resolved = fs::canonicalize(path).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => ConfigError::MissingFile(path.to_path_buf()),
                _ => ConfigError::io("resolve path", path, e),
            })?;
            ensure_below(&resolved_lock_dir, &resolved, false)
        }
        Existence::MustNotExist => {
            if fs::symlink_metadata(path).is_ok() {
                return Err(ConfigError::TargetExists(path.to_path_buf()));
            }
            check_entry_location(lock_dir, &resolved_lock_dir, path)
        }
    }
}

/// Validate a lock-in directory and return its resolved form.
fn resolve_lock_dir(lock_dir: &Path) -> Result<PathBuf, ConfigError> {
    let invalid = || ConfigError::InvalidLockInDir(lock_dir.to_path_buf());

    if lock_dir.as_os_str().is_empty()
        || !lock_dir.is_absolute()
        || lock_dir.parent().is_none()
        || has_parent_component(lock_dir)
        || !lock_dir.is_dir()
    {
        return Err(invalid());
    }

    let resolved = fs::canonicalize(lock_dir).map_err(|_| invalid())?;
    if resolved.parent().is_none() {
        return Err(invalid());
    }
    Ok(resolved)
}

/// Check where a directory entry itself lives, without following it.
///
/// The literal path must be inside `lock_dir` and its resolved parent inside
/// `resolved_lock_dir`.
fn check_entry_location(lock_dir: &Path, resolved_lock_dir: &Path, path: &Path) -> Result<(), ConfigError> {
    ensure_below(lock_dir, path, false)?;

    let parent = path
        .parent()
        .ok_or_else(|| ConfigError::InvalidPath(path.to_path_buf()))?;
    let resolved_parent = fs::canonicalize(parent).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConfigError::MissingFile(parent.to_path_buf()),
        _ => ConfigError::io("resolve path", parent, e),
    })?;
    ensure_below(resolved_lock_dir, &resolved_parent, true)
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Component-wise prefix check.
fn ensure_below(lock_dir: &Path, path: &Path, allow_equal: bool) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidPath(path.to_path_buf()));
    }

    let inside = !has_parent_component(path)
        && path.starts_with(lock_dir)
        && (allow_equal || path != lock_dir);

    if inside {
        Ok(())
    } else {
        tracing::error!(
            lock_dir = %lock_dir.display(),
            path = %path.display(),
            "Lock-in containment check failed"
        );
        Err(ConfigError::ContainmentViolation {
            lock_dir: lock_dir.to_path_buf(),
            path: path.to_path_buf(),
        })
    }
}

/// Move `source` (inside `source_lock_dir`) to `target` (inside
/// `target_lock_dir`) with a single rename.
///
/// All checks run before anything is touched; `target` must not exist.
pub fn move_into(
    source_lock_dir: &Path,
    source: &Path,
    target_lock_dir: &Path,
    target: &Path,
) -> Result<(), ConfigError> {
    check_lock_in(source_lock_dir, source, Existence::MustExist)?;
    check_lock_in(target_lock_dir, target, Existence::MustNotExist)?;

    let metadata = fs::symlink_metadata(source).map_err(|e| ConfigError::io("stat", source, e))?;
    if !metadata.file_type().is_file() {
        return Err(ConfigError::NotAFile(source.to_path_buf()));
    }

    tracing::info!(source = %source.display(), target = %target.display(), "Moving file");
    fs::rename(source, target).map_err(|e| {
        tracing::error!(error = %e, "Move failed");
        ConfigError::io("move", source, e)
    })
}

/// Delete a single file inside `lock_dir`.
///
/// A missing path or a directory is left alone. A symbolic link is unlinked;
/// its target is never touched.
pub fn delete_file(lock_dir: &Path, file: &Path) -> Result<(), ConfigError> {
    let metadata = match fs::symlink_metadata(file) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(file = %file.display(), "File does not exist, doing nothing");
            return Ok(());
        }
        Err(e) => return Err(ConfigError::io("stat", file, e)),
    };

    let file_type = metadata.file_type();
    if file_type.is_dir() {
        tracing::info!(file = %file.display(), "Path is not a file, doing nothing");
        return Ok(());
    }

    if file_type.is_symlink() {
        check_entry_location(lock_dir, &resolve_lock_dir(lock_dir)?, file)?;
    } else {
        check_lock_in(lock_dir, file, Existence::MustExist)?;
    }

    tracing::debug!(file = %file.display(), "Deleting file");
    fs::remove_file(file).map_err(|e| ConfigError::io("delete file", file, e))
}

/// Delete a directory tree inside `lock_dir`, children first.
///
/// Symbolic links anywhere in the tree, including links to directories, are
/// unlinked and never traversed.
pub fn delete_tree(lock_dir: &Path, dir: &Path) -> Result<(), ConfigError> {
    let metadata = match fs::symlink_metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(dir = %dir.display(), "Directory does not exist, doing nothing");
            return Ok(());
        }
        Err(e) => return Err(ConfigError::io("stat", dir, e)),
    };

    if metadata.file_type().is_symlink() {
        check_entry_location(lock_dir, &resolve_lock_dir(lock_dir)?, dir)?;
        return fs::remove_file(dir).map_err(|e| ConfigError::io("unlink", dir, e));
    }
    if !metadata.is_dir() {
        tracing::info!(dir = %dir.display(), "Path is not a directory, doing nothing");
        return Ok(());
    }

    check_lock_in(lock_dir, dir, Existence::MustExist)?;

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true)
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ConfigError::io("walk", path, io::Error::from(e))
        })?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            fs::remove_dir(path).map_err(|e| ConfigError::io("delete directory", path, e))?;
        } else {
            fs::remove_file(path).map_err(|e| ConfigError::io("delete file", path, e))?;
        }
    }

    fs::remove_dir(dir).map_err(|e| ConfigError::io("delete directory", dir, e))
}

/// Allocates staging areas below the upload root and streams uploads into them.
#[derive(Debug, Clone)]
pub struct FileStaging {
    upload_root: PathBuf,
    max_upload_bytes: u64,
}

impl FileStaging {
    /// Create the staging layer, creating `upload_root` if necessary.
    pub fn new(upload_root: impl AsRef<Path>, max_upload_bytes: u64) -> Result<Self, ConfigError> {
        let upload_root = upload_root.as_ref().to_path_buf();
        fs::create_dir_all(&upload_root)
            .map_err(|e| ConfigError::io("create upload root", &upload_root, e))?;
        resolve_lock_dir(&upload_root)?;

        Ok(Self {
            upload_root,
            max_upload_bytes,
        })
    }

    /// Lock-in directory of every staging area.
    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Create a fresh, exclusively owned staging area for `context`.
    pub fn create_staging_area(&self, context: &SecurityContext) -> Result<StagingArea, ConfigError> {
        let context_dir = self.upload_root.join(context.as_str());
        fs::create_dir_all(&context_dir)
            .map_err(|e| ConfigError::io("create context directory", &context_dir, e))?;

        let name = format!(
            "{}-{}",
            Utc::now().timestamp(),
            random_alphanumeric(AREA_RANDOM_LEN)
        );
        let path = context_dir.join(name);

        // Leaf creation is a single mkdir: it either fully succeeds or leaves nothing.
        fs::create_dir(&path).map_err(|e| ConfigError::io("create staging area", &path, e))?;

        tracing::debug!(context = %context, area = %path.display(), "Created staging area");
        Ok(StagingArea {
            lock_dir: self.upload_root.clone(),
            path,
            removed: false,
        })
    }

    /// Stream `source` into a new file in `area`.
    ///
    /// Reads in [`STREAM_CHUNK_BYTES`] chunks and aborts as soon as more than
    /// the configured cap would be written. On every error the partial file
    /// is removed before returning.
    pub fn write_stream<'a, R: Read>(
        &self,
        mut source: R,
        area: &'a StagingArea,
        suffix: &str,
    ) -> Result<UploadedArtifact<'a>, StagingError> {
        if !validate::is_file_suffix(suffix) {
            return Err(ConfigError::InvalidSuffix(suffix.to_string()).into());
        }
        check_lock_in(area.lock_dir(), area.path(), Existence::MustExist)?;

        let path = area
            .path()
            .join(format!("{}{}", random_alphanumeric(FILE_RANDOM_LEN), suffix));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| ConfigError::io("create staged file", &path, e))?;
        let mut partial = PartialFile {
            path: &path,
            file,
            kept: false,
        };

        let mut buffer = [0u8; STREAM_CHUNK_BYTES];
        let mut written = 0u64;
        loop {
            let n = match source.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ConfigError::io("read upload stream", &path, e).into()),
            };

            if written + n as u64 > self.max_upload_bytes {
                tracing::warn!(
                    max_bytes = self.max_upload_bytes,
                    written,
                    "Upload exceeds maximum size, aborting"
                );
                return Err(OversizeError {
                    max_bytes: self.max_upload_bytes,
                }
                .into());
            }

            partial
                .file
                .write_all(&buffer[..n])
                .map_err(|e| ConfigError::io("write staged file", &path, e))?;
            written += n as u64;
        }

        partial
            .file
            .flush()
            .map_err(|e| ConfigError::io("flush staged file", &path, e))?;
        partial.keep();

        tracing::debug!(file = %path.display(), bytes = written, "Upload staged");
        Ok(UploadedArtifact {
            area,
            path,
            len: written,
        })
    }
}

/// Removes a partially written file unless kept.
struct PartialFile<'p> {
    path: &'p Path,
    file: File,
    kept: bool,
}

impl PartialFile<'_> {
    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.kept {
            if let Err(e) = fs::remove_file(self.path) {
                tracing::error!(file = %self.path.display(), error = %e, "Cannot remove partial upload");
            }
        }
    }
}

/// A staging directory owned by one upload.
///
/// The directory and everything still in it are deleted when the area is
/// dropped or [`remove`](StagingArea::remove)d.
#[derive(Debug)]
pub struct StagingArea {
    lock_dir: PathBuf,
    path: PathBuf,
    removed: bool,
}

impl StagingArea {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock-in directory (the upload root).
    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Delete the area now, reporting failures.
    pub fn remove(mut self) -> Result<(), ConfigError> {
        self.removed = true;
        delete_tree(&self.lock_dir, &self.path)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = delete_tree(&self.lock_dir, &self.path) {
            tracing::error!(area = %self.path.display(), error = %e, "Cannot remove staging area");
        }
    }
}

/// A fully written upload inside a staging area (not yet verified).
#[derive(Debug)]
pub struct UploadedArtifact<'a> {
    area: &'a StagingArea,
    path: PathBuf,
    len: u64,
}

impl<'a> UploadedArtifact<'a> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Hash the staged content and compare it with `claimed`.
    ///
    /// On mismatch the artifact is deleted (rejected) and cannot be used again.
    pub fn verify(self, claimed: &str) -> Result<VerifiedArtifact<'a>, VerifyError> {
        let computed = checksum::checksum_of(&self.path)?;

        if let Err(mismatch) = checksum::verify(&computed, claimed) {
            tracing::warn!(expected = %mismatch.expected, actual = %mismatch.actual, "Checksum mismatch, rejecting upload");
            delete_file(self.area.lock_dir(), &self.path)?;
            return Err(mismatch.into());
        }

        Ok(VerifiedArtifact {
            area: self.area,
            path: self.path,
            len: self.len,
            checksum: computed,
        })
    }
}

/// Errors from [`UploadedArtifact::verify`].
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Mismatch(#[from] ChecksumMismatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// An upload whose content matches its claimed checksum.
///
/// Consumed by [`publish`](VerifiedArtifact::publish) or
/// [`reject`](VerifiedArtifact::reject).
#[derive(Debug)]
pub struct VerifiedArtifact<'a> {
    area: &'a StagingArea,
    path: PathBuf,
    len: u64,
    checksum: String,
}

impl VerifiedArtifact<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lower-case hex SHA-256 of the content.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Lock-in directory the artifact currently lives in.
    pub fn lock_dir(&self) -> &Path {
        self.area.lock_dir()
    }

    /// Mark the artifact as handed off to its final location.
    pub fn publish(self, location: impl Into<PathBuf>) -> PublishedArtifact {
        PublishedArtifact {
            location: location.into(),
            len: self.len,
            checksum: self.checksum,
        }
    }

    /// Delete the artifact.
    pub fn reject(self) -> Result<(), ConfigError> {
        delete_file(self.area.lock_dir(), &self.path)
    }
}

/// Terminal record of a published artifact; it no longer lives in staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub location: PathBuf,
    pub len: u64,
    pub checksum: String,
}
