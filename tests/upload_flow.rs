//! End-to-end upload tests
//!
//! Requests are built and signed with the client library, framed, and fed
//! through the server's request handler with sandboxed directories.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use syncany_api::{ApiResponse, ErrorCode, ReleaseMetadata, RequestSigner, UploadRequest};
use syncany_protocol::ops::{
    Architecture, ArtifactType, Dist, LatestReleasesResponse, OperatingSystem, UploadResponse,
};
use syncany_server::release_index::{ReleaseEntry, ReleaseIndex};
use syncany_server::store::IndexError;
use syncany_server::{KeyStore, RpcHandler, SecurityContext, ServerConfig, Services};

const APP_SECRET: &str = "a9d1d8b2e0c3f4567890abcdef012345";
const NOTIFIER_SECRET: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";

struct Server {
    tmp: tempfile::TempDir,
    handler: RpcHandler,
}

impl Server {
    fn start() -> Self {
        Self::with_max_upload(syncany_protocol::MAX_UPLOAD_BYTES)
    }

    fn with_max_upload(max_upload_bytes: u64) -> Self {
        Self::build(max_upload_bytes, |services| services)
    }

    fn build(max_upload_bytes: u64, customize: impl FnOnce(Services) -> Services) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let keys_dir = tmp.path().join("keys");
        fs::create_dir_all(&keys_dir).unwrap();
        fs::write(
            keys_dir.join("application-put.properties"),
            format!("# build server\nkey = {}\n", APP_SECRET),
        )
        .unwrap();
        fs::write(
            keys_dir.join("osx-notifier-put.properties"),
            format!("key = {}\n", NOTIFIER_SECRET),
        )
        .unwrap();

        let config = ServerConfig {
            upload_root: tmp.path().join("upload"),
            keys_dir,
            dist_root: tmp.path().join("dist"),
            base_url: "https://get.example.org/dist".to_string(),
            max_upload_bytes,
            release_index_path: tmp.path().join("state/releases.json"),
            links_path: tmp.path().join("state/links.json"),
            ..ServerConfig::default()
        };
        config.validate().unwrap();

        let handler = RpcHandler::new(customize(Services::from_config(config).unwrap()));
        Self { tmp, handler }
    }

    fn send(&self, framed: &[u8]) -> ApiResponse {
        let mut reader = Cursor::new(framed.to_vec());
        let mut output = Vec::new();
        self.handler.run_with_io(&mut reader, &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    fn send_upload(&self, upload: &UploadRequest) -> ApiResponse {
        let mut framed = Vec::new();
        upload.write_to(&mut framed).unwrap();
        self.send(&framed)
    }

    fn dist(&self) -> PathBuf {
        self.tmp.path().join("dist")
    }

    /// Number of files and directories left below the upload root's contexts.
    fn staged_entries(&self) -> usize {
        let upload = self.tmp.path().join("upload");
        let mut count = 0;
        for context in fs::read_dir(upload).unwrap() {
            count += fs::read_dir(context.unwrap().path()).unwrap().count();
        }
        count
    }
}

fn release_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn cli_metadata(filename: &str, artifact_type: ArtifactType, snapshot: bool) -> ReleaseMetadata {
    ReleaseMetadata {
        filename: filename.to_string(),
        version: "0.4.0-alpha".to_string(),
        date: "2015-02-14".to_string(),
        snapshot,
        os: OperatingSystem::All,
        arch: Architecture::All,
        dist: Dist::Cli,
        artifact_type,
    }
}

// =============================================================================
// application-put happy path
// =============================================================================

#[test]
fn test_release_upload_is_published_and_indexed() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let content = b"\x1f\x8b release archive".repeat(1000);
    let file = release_file(work.path(), "build.tar.gz", &content);

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-0.4.0-alpha.tar.gz", ArtifactType::TarGz, false),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));

    let response = server.send_upload(&upload);
    assert!(response.ok, "upload failed: {:?}", response.error);
    assert_eq!(response.status, 200);

    let payload: UploadResponse = serde_json::from_value(response.payload.unwrap()).unwrap();
    assert_eq!(payload.fullpath, "/releases/syncany-cli-0.4.0-alpha.tar.gz");
    assert_eq!(Some(payload.checksum.as_str()), upload.request().arg("checksum"));

    let published = server.dist().join("releases/syncany-cli-0.4.0-alpha.tar.gz");
    assert_eq!(fs::read(published).unwrap(), content);
    assert_eq!(server.staged_entries(), 0);

    // The release shows up in the latest-release listing.
    let response = server.send(b"{\"request_id\":\"q1\",\"method\":\"GET\",\"resource\":\"app\",\"path_args\":[\"cli\"]}\n");
    assert_eq!(response.status, 200);
    let latest: LatestReleasesResponse = serde_json::from_value(response.payload.unwrap()).unwrap();
    assert_eq!(latest.releases.len(), 1);
    assert_eq!(
        latest.releases[0].download_url,
        "https://get.example.org/dist/releases/syncany-cli-0.4.0-alpha.tar.gz"
    );
    assert!(latest.releases[0].release);
}

#[test]
fn test_snapshot_hidden_unless_requested() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "snap.zip", b"zip bytes");

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-0.4.1-SNAPSHOT.zip", ArtifactType::Zip, true),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));
    assert!(server.send_upload(&upload).ok);
    assert!(server.dist().join("snapshots/syncany-cli-0.4.1-SNAPSHOT.zip").is_file());

    let response = server.send(b"{\"request_id\":\"q1\",\"method\":\"GET\",\"resource\":\"app\"}\n");
    assert_eq!(response.status, 204);

    let response = server.send(
        b"{\"request_id\":\"q2\",\"method\":\"GET\",\"resource\":\"app\",\"args\":{\"snapshots\":\"true\"}}\n",
    );
    assert_eq!(response.status, 200);
}

#[test]
fn test_osx_notifier_upload() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "notifier.app.zip", b"PK notifier");

    let mut upload = UploadRequest::osx_notifier(&file, "syncany-osx-notifier-1.0.app.zip", false).unwrap();
    upload.sign(&RequestSigner::new(NOTIFIER_SECRET));

    let response = server.send_upload(&upload);
    assert!(response.ok, "upload failed: {:?}", response.error);
    assert!(server
        .dist()
        .join("releases/syncany-osx-notifier-1.0.app.zip")
        .is_file());
}

/// Release index whose writes always fail.
struct UnwritableIndex;

impl ReleaseIndex for UnwritableIndex {
    fn record(&self, _entry: ReleaseEntry) -> Result<(), IndexError> {
        Err(IndexError::Io {
            op: "write",
            path: PathBuf::from("/state/releases.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn entries(&self) -> Result<Vec<ReleaseEntry>, IndexError> {
        Ok(Vec::new())
    }
}

#[test]
fn test_index_failure_after_publish_still_succeeds() {
    let server = Server::build(syncany_protocol::MAX_UPLOAD_BYTES, |services| {
        services.with_release_index(UnwritableIndex)
    });
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "build.zip", b"PK archive");

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-0.4.0-alpha.zip", ArtifactType::Zip, false),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));

    let response = server.send_upload(&upload);
    assert!(response.ok, "upload failed: {:?}", response.error);
    assert_eq!(response.status, 200);

    let payload: UploadResponse = serde_json::from_value(response.payload.unwrap()).unwrap();
    assert_eq!(payload.fullpath, "/releases/syncany-cli-0.4.0-alpha.zip");
    assert!(server.dist().join("releases/syncany-cli-0.4.0-alpha.zip").is_file());
    assert_eq!(server.staged_entries(), 0);
}

// =============================================================================
// Authentication failures
// =============================================================================

#[test]
fn test_tampered_filename_is_unauthorized() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "build.tar.gz", b"content");

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-0.4.0.tar.gz", ArtifactType::TarGz, false),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));

    let mut request = upload.request().clone();
    request
        .args
        .insert("filename".to_string(), "syncany-cli-9.9.9.tar.gz".to_string());

    let mut framed = serde_json::to_vec(&request).unwrap();
    framed.push(b'\n');
    framed.extend_from_slice(b"content");

    let response = server.send(&framed);
    let error = response.error.unwrap();
    assert_eq!(error.code, ErrorCode::Unauthorized);
    assert_eq!(error.message, "Authentication failed");
    assert_eq!(response.status, 401);
    assert!(!server.dist().join("releases").exists());
    assert!(!server.tmp.path().join("upload/application-put").exists());
}

#[test]
fn test_wrong_context_secret_is_unauthorized() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "build.tar.gz", b"content");

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-0.4.0.tar.gz", ArtifactType::TarGz, false),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(NOTIFIER_SECRET));

    let response = server.send_upload(&upload);
    assert_eq!(response.error.unwrap().code, ErrorCode::Unauthorized);
}

#[test]
fn test_stale_request_is_unauthorized() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "build.tar.gz", b"content");

    let upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-0.4.0.tar.gz", ArtifactType::TarGz, false),
    )
    .unwrap();
    let mut request = upload.request().clone();
    let stale = chrono::Utc::now().timestamp() - 181;
    RequestSigner::new(APP_SECRET).sign_at(&mut request, stale, "abcdefg");

    let mut framed = serde_json::to_vec(&request).unwrap();
    framed.push(b'\n');
    framed.extend_from_slice(b"content");

    let response = server.send(&framed);
    assert_eq!(response.error.unwrap().code, ErrorCode::Unauthorized);
}

// =============================================================================
// Rejected content
// =============================================================================

#[test]
fn test_checksum_mismatch_leaves_nothing_behind() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "build.tar.gz", b"original content");

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-0.4.0.tar.gz", ArtifactType::TarGz, false),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));

    // Same length, different bytes.
    fs::write(&file, b"tampered content").unwrap();

    let response = server.send_upload(&upload);
    assert_eq!(response.error.unwrap().code, ErrorCode::ChecksumMismatch);
    assert_eq!(response.status, 400);
    assert_eq!(server.staged_entries(), 0);
    assert!(!server.dist().join("releases").exists());
}

#[test]
fn test_oversize_upload_rejected() {
    let server = Server::with_max_upload(1024);
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "big.zip", &vec![0u8; 1025]);

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-big.zip", ArtifactType::Zip, false),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));

    let response = server.send_upload(&upload);
    assert_eq!(response.error.unwrap().code, ErrorCode::PayloadTooLarge);
    assert_eq!(response.status, 413);
    assert_eq!(server.staged_entries(), 0);
}

#[test]
fn test_exact_cap_upload_accepted() {
    let server = Server::with_max_upload(1024);
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "exact.zip", &vec![7u8; 1024]);

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany-cli-exact.zip", ArtifactType::Zip, false),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));

    assert!(server.send_upload(&upload).ok);
}

#[test]
fn test_unsupported_dist_type_rejected_after_auth() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "docs.zip", b"docs");

    let mut metadata = cli_metadata("docs.zip", ArtifactType::Docs, false);
    metadata.dist = Dist::Other;
    let mut upload = UploadRequest::release(&file, &metadata).unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));

    let response = server.send_upload(&upload);
    assert_eq!(response.error.unwrap().code, ErrorCode::InvalidRequest);
    assert!(!server.tmp.path().join("upload/application-put").exists());
}

#[test]
fn test_deb_without_apt_is_server_error() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "syncany.deb", b"!<arch>");

    let mut upload = UploadRequest::release(
        &file,
        &cli_metadata("syncany_0.4.0_all.deb", ArtifactType::Deb, false),
    )
    .unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));

    let response = server.send_upload(&upload);
    let error = response.error.unwrap();
    assert_eq!(error.code, ErrorCode::ServerError);
    assert!(!error.message.contains('/'));
    assert_eq!(server.staged_entries(), 0);
}

#[test]
fn test_existing_target_is_not_overwritten() {
    let server = Server::start();
    let work = tempfile::tempdir().unwrap();
    let file = release_file(work.path(), "a.zip", b"first");

    let mut upload = UploadRequest::release(&file, &cli_metadata("same.zip", ArtifactType::Zip, false)).unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));
    assert!(server.send_upload(&upload).ok);

    fs::write(&file, b"second").unwrap();
    let mut upload = UploadRequest::release(&file, &cli_metadata("same.zip", ArtifactType::Zip, false)).unwrap();
    upload.sign(&RequestSigner::new(APP_SECRET));
    let response = server.send_upload(&upload);

    assert_eq!(response.error.unwrap().code, ErrorCode::ServerError);
    assert_eq!(fs::read(server.dist().join("releases/same.zip")).unwrap(), b"first");
    assert_eq!(server.staged_entries(), 0);
}

#[test]
fn test_key_store_contexts() {
    let server = Server::start();
    let keys = KeyStore::load(&server.tmp.path().join("keys")).unwrap();
    let names: Vec<_> = keys.contexts().iter().map(|c| c.to_string()).collect();
    assert_eq!(names, vec!["application-put", "osx-notifier-put"]);
    assert!(keys
        .get_secret(&SecurityContext::new("application-put").unwrap())
        .is_ok());
}
