//! Syncany API client
//!
//! Builds signed requests for the Syncany release and link API and frames
//! them for the `syncany-server` request handler.

pub mod error;
pub mod request;
pub mod signer;

pub use error::ClientError;
pub use request::{
    file_checksum, link_add_request, link_get_request, write_framed, ReleaseMetadata, UploadRequest,
};
pub use signer::RequestSigner;
pub use syncany_protocol::{ApiError, ApiRequest, ApiResponse, ErrorCode, Method};
