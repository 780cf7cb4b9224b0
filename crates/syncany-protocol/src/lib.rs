//! Syncany API Protocol Types
//!
//! Defines the JSON request/response envelope exchanged with the API server
//! and the request-signing scheme shared by clients and the server.

pub mod error;
pub mod keys;
pub mod random;
pub mod request;
pub mod response;
pub mod signing;
pub mod ops;

pub use error::{ApiError, ErrorCode};
pub use random::random_alphanumeric;
pub use request::{ApiRequest, Method};
pub use response::ApiResponse;
pub use signing::{
    canonical_string, compute_signature, SignedRequest, SigningFieldError, ARG_RAND,
    ARG_SIGNATURE, ARG_TIME,
};

/// Maximum size of an uploaded request body in bytes (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 52_428_800;

/// Default allowed deviation between client and server clocks, in seconds.
pub const DEFAULT_REPLAY_WINDOW_SECONDS: u64 = 180;
