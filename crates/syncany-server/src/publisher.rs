//! Hand-off of verified artifacts to their public location.
//!
//! Publishers receive a verified staged file plus its channel and target file
//! name. On failure the staged file must still be where it was; the caller
//! then rejects it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use syncany_protocol::ops::Channel;
use thiserror::Error;

use crate::config::AptConfig;
use crate::error::ConfigError;
use crate::staging::{self, VerifiedArtifact};
use crate::validate;

/// Errors raised while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid target file name: {0:?}")]
    InvalidFileName(String),

    #[error("no APT repository configured")]
    AptNotConfigured,

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with {status}")]
    ToolFailed { program: String, status: ExitStatus },
}

/// Where a published artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Filesystem location below the distribution root.
    pub location: PathBuf,
    /// Public path, relative to the download base URL (starts with `/`).
    pub fullpath: String,
}

/// Moves (or registers) a verified artifact into public distribution.
pub trait Publisher {
    fn publish(
        &self,
        artifact: &VerifiedArtifact<'_>,
        channel: Channel,
        filename: &str,
    ) -> Result<Publication, PublishError>;
}

/// Moves artifacts to `<dist_root>/<releases|snapshots>/<filename>`.
#[derive(Debug, Clone)]
pub struct DistDirectoryPublisher {
    dist_root: PathBuf,
}

impl DistDirectoryPublisher {
    pub fn new(dist_root: impl Into<PathBuf>) -> Self {
        Self {
            dist_root: dist_root.into(),
        }
    }

    pub fn dist_root(&self) -> &Path {
        &self.dist_root
    }
}

impl Publisher for DistDirectoryPublisher {
    fn publish(
        &self,
        artifact: &VerifiedArtifact<'_>,
        channel: Channel,
        filename: &str,
    ) -> Result<Publication, PublishError> {
        if !validate::is_file_name(filename) {
            return Err(PublishError::InvalidFileName(filename.to_string()));
        }

        let channel_dir = self.dist_root.join(channel.dist_dir());
        fs::create_dir_all(&channel_dir)
            .map_err(|e| ConfigError::io("create distribution directory", &channel_dir, e))?;

        let target = channel_dir.join(filename);
        staging::move_into(artifact.lock_dir(), artifact.path(), &self.dist_root, &target)?;

        tracing::info!(channel = %channel, file = %filename, "Artifact published");
        Ok(Publication {
            location: target,
            fullpath: format!("/{}/{}", channel.dist_dir(), filename),
        })
    }
}

/// Publishes `.deb` packages to the distribution directory, then adds them to
/// the channel's APT repository.
///
/// If the repository tool fails the package is moved back to staging, so the
/// distribution directory and the repository never disagree.
#[derive(Debug, Clone)]
pub struct AptPublisher {
    apt: AptConfig,
    dist: DistDirectoryPublisher,
}

impl AptPublisher {
    pub fn new(apt: AptConfig, dist: DistDirectoryPublisher) -> Self {
        Self { apt, dist }
    }

    /// Argument vector passed to the repository tool.
    pub fn include_args(&self, channel: Channel, deb_file: &Path) -> Vec<String> {
        let mut base_dir = self.apt.repo_for(channel).display().to_string();
        if !base_dir.ends_with('/') {
            base_dir.push('/');
        }

        vec![
            "--basedir".to_string(),
            base_dir,
            "--gnupghome".to_string(),
            self.apt.gnupg_home.display().to_string(),
            "--component".to_string(),
            "main".to_string(),
            "includedeb".to_string(),
            channel.as_str().to_string(),
            deb_file.display().to_string(),
        ]
    }

    fn include_deb(&self, channel: Channel, deb_file: &Path) -> Result<(), PublishError> {
        let args = self.include_args(channel, deb_file);
        tracing::info!(program = %self.apt.program, codename = %channel, "Adding package to APT repository");

        let output = Command::new(&self.apt.program)
            .args(&args)
            .output()
            .map_err(|source| PublishError::Spawn {
                program: self.apt.program.clone(),
                source,
            })?;

        if !output.status.success() {
            tracing::error!(
                program = %self.apt.program,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Repository tool failed"
            );
            return Err(PublishError::ToolFailed {
                program: self.apt.program.clone(),
                status: output.status,
            });
        }

        tracing::debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "Repository tool output");
        Ok(())
    }
}

impl Publisher for AptPublisher {
    fn publish(
        &self,
        artifact: &VerifiedArtifact<'_>,
        channel: Channel,
        filename: &str,
    ) -> Result<Publication, PublishError> {
        let publication = self.dist.publish(artifact, channel, filename)?;

        if let Err(e) = self.include_deb(channel, &publication.location) {
            if let Err(undo) = staging::move_into(
                self.dist.dist_root(),
                &publication.location,
                artifact.lock_dir(),
                artifact.path(),
            ) {
                tracing::error!(
                    error = %undo,
                    file = %publication.location.display(),
                    "Failed to return package to staging"
                );
            }
            return Err(e);
        }

        Ok(publication)
    }
}

/// Stand-in for `deb` uploads when no APT repository is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredAptPublisher;

impl Publisher for UnconfiguredAptPublisher {
    fn publish(
        &self,
        _artifact: &VerifiedArtifact<'_>,
        _channel: Channel,
        _filename: &str,
    ) -> Result<Publication, PublishError> {
        Err(PublishError::AptNotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SecurityContext;
    use crate::staging::FileStaging;
    use std::io::Cursor;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    struct Sandbox {
        _tmp: tempfile::TempDir,
        staging: FileStaging,
        dist_root: PathBuf,
    }

    fn sandbox() -> Sandbox {
        let tmp = tempfile::tempdir().unwrap();
        let staging = FileStaging::new(tmp.path().join("upload"), 1024).unwrap();
        let dist_root = tmp.path().join("dist");
        fs::create_dir_all(&dist_root).unwrap();
        Sandbox {
            _tmp: tmp,
            staging,
            dist_root,
        }
    }

    fn apt_config(program: &str) -> AptConfig {
        AptConfig {
            program: program.to_string(),
            gnupg_home: PathBuf::from("/srv/gnupg"),
            release_repo: PathBuf::from("/srv/apt/release"),
            snapshot_repo: PathBuf::from("/srv/apt/snapshot"),
        }
    }

    #[test]
    fn test_dist_publisher_moves_into_channel_dir() {
        let sb = sandbox();
        let area = sb
            .staging
            .create_staging_area(&SecurityContext::new("application-put").unwrap())
            .unwrap();
        let verified = sb
            .staging
            .write_stream(Cursor::new(Vec::new()), &area, ".deb")
            .unwrap()
            .verify(EMPTY_SHA256)
            .unwrap();
        let staged = verified.path().to_path_buf();

        let publication = DistDirectoryPublisher::new(&sb.dist_root)
            .publish(&verified, Channel::Snapshot, "syncany_0.4.0_all.deb")
            .unwrap();

        assert_eq!(publication.fullpath, "/snapshots/syncany_0.4.0_all.deb");
        assert_eq!(publication.location, sb.dist_root.join("snapshots/syncany_0.4.0_all.deb"));
        assert!(publication.location.is_file());
        assert!(!staged.exists());
    }

    #[test]
    fn test_dist_publisher_rejects_path_like_names() {
        let sb = sandbox();
        let area = sb
            .staging
            .create_staging_area(&SecurityContext::new("application-put").unwrap())
            .unwrap();
        let verified = sb
            .staging
            .write_stream(Cursor::new(Vec::new()), &area, "")
            .unwrap()
            .verify(EMPTY_SHA256)
            .unwrap();

        let result = DistDirectoryPublisher::new(&sb.dist_root).publish(&verified, Channel::Release, "../x");
        assert!(matches!(result, Err(PublishError::InvalidFileName(_))));
        assert!(verified.path().exists());
    }

    #[test]
    fn test_apt_args_are_a_vector() {
        let publisher = AptPublisher::new(apt_config("reprepro"), DistDirectoryPublisher::new("/srv/dist"));
        let args = publisher.include_args(Channel::Release, Path::new("/srv/upload/a b.deb"));

        assert_eq!(
            args,
            vec![
                "--basedir",
                "/srv/apt/release/",
                "--gnupghome",
                "/srv/gnupg",
                "--component",
                "main",
                "includedeb",
                "release",
                "/srv/upload/a b.deb",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_apt_failure_leaves_source_in_place() {
        let sb = sandbox();
        let area = sb
            .staging
            .create_staging_area(&SecurityContext::new("application-put").unwrap())
            .unwrap();
        let verified = sb
            .staging
            .write_stream(Cursor::new(Vec::new()), &area, ".deb")
            .unwrap()
            .verify(EMPTY_SHA256)
            .unwrap();

        let publisher = AptPublisher::new(apt_config("false"), DistDirectoryPublisher::new(&sb.dist_root));
        let result = publisher.publish(&verified, Channel::Release, "x.deb");

        assert!(matches!(result, Err(PublishError::ToolFailed { .. })));
        assert!(verified.path().exists());
        assert!(!sb.dist_root.join("releases/x.deb").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_apt_success_publishes_to_dist() {
        let sb = sandbox();
        let area = sb
            .staging
            .create_staging_area(&SecurityContext::new("application-put").unwrap())
            .unwrap();
        let verified = sb
            .staging
            .write_stream(Cursor::new(Vec::new()), &area, ".deb")
            .unwrap()
            .verify(EMPTY_SHA256)
            .unwrap();

        let publisher = AptPublisher::new(apt_config("true"), DistDirectoryPublisher::new(&sb.dist_root));
        let publication = publisher.publish(&verified, Channel::Release, "x.deb").unwrap();
        assert!(publication.location.is_file());
    }

    #[cfg(unix)]
    fn marker_script(dir: &Path, marker: &Path) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-reprepro");
        fs::write(&script, format!("#!/bin/sh\ntouch '{}'\n", marker.display())).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn test_apt_existing_target_skips_repository() {
        let sb = sandbox();
        let marker = sb.dist_root.parent().unwrap().join("tool-ran");
        let program = marker_script(sb.dist_root.parent().unwrap(), &marker);

        let existing = sb.dist_root.join("releases/x.deb");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"already published").unwrap();

        let area = sb
            .staging
            .create_staging_area(&SecurityContext::new("application-put").unwrap())
            .unwrap();
        let verified = sb
            .staging
            .write_stream(Cursor::new(Vec::new()), &area, ".deb")
            .unwrap()
            .verify(EMPTY_SHA256)
            .unwrap();

        let publisher = AptPublisher::new(apt_config(&program), DistDirectoryPublisher::new(&sb.dist_root));
        let result = publisher.publish(&verified, Channel::Release, "x.deb");

        assert!(matches!(
            result,
            Err(PublishError::Config(ConfigError::TargetExists(_)))
        ));
        assert!(!marker.exists());
        assert_eq!(fs::read(&existing).unwrap(), b"already published");
        assert!(verified.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_apt_tool_sees_published_location() {
        let sb = sandbox();
        let marker = sb.dist_root.parent().unwrap().join("tool-ran");
        let program = marker_script(sb.dist_root.parent().unwrap(), &marker);

        let area = sb
            .staging
            .create_staging_area(&SecurityContext::new("application-put").unwrap())
            .unwrap();
        let verified = sb
            .staging
            .write_stream(Cursor::new(Vec::new()), &area, ".deb")
            .unwrap()
            .verify(EMPTY_SHA256)
            .unwrap();

        let publisher = AptPublisher::new(apt_config(&program), DistDirectoryPublisher::new(&sb.dist_root));
        let publication = publisher.publish(&verified, Channel::Snapshot, "x.deb").unwrap();

        assert!(marker.exists());
        assert_eq!(publication.location, sb.dist_root.join("snapshots/x.deb"));
        assert!(publication.location.is_file());
        assert!(!verified.path().exists());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let sb = sandbox();
        let area = sb
            .staging
            .create_staging_area(&SecurityContext::new("application-put").unwrap())
            .unwrap();
        let verified = sb
            .staging
            .write_stream(Cursor::new(Vec::new()), &area, ".deb")
            .unwrap()
            .verify(EMPTY_SHA256)
            .unwrap();

        let publisher = AptPublisher::new(
            apt_config("syncany-no-such-program"),
            DistDirectoryPublisher::new(&sb.dist_root),
        );
        let result = publisher.publish(&verified, Channel::Release, "x.deb");
        assert!(matches!(result, Err(PublishError::Spawn { .. })));
        assert!(verified.path().exists());
        assert!(!sb.dist_root.join("releases/x.deb").exists());
    }
}
