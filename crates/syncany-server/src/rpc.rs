//! API request handler.
//!
//! Serves one request per process invocation:
//!
//!   syncany-server serve --config /etc/syncany-api/server.toml
//!
//! The handler reads a single JSON header line from stdin, followed by
//! exactly `body_length` raw bytes for `PUT` requests, dispatches to the
//! operation handler, and writes a single JSON response line to stdout.

use std::io::{self, BufRead, Read, Write};

use syncany_protocol::{ApiError, ApiRequest, ApiResponse};

use crate::dispatcher::Dispatcher;
use crate::services::Services;

/// Upper bound on the header line, in bytes.
pub const MAX_HEADER_BYTES: u64 = 64 * 1024;

/// Main request handler of the server.
pub struct RpcHandler {
    services: Services,
    dispatcher: Dispatcher,
}

impl RpcHandler {
    /// Create a handler with the standard dispatch table.
    pub fn new(services: Services) -> Self {
        Self::with_dispatcher(services, Dispatcher::standard())
    }

    pub fn with_dispatcher(services: Services, dispatcher: Dispatcher) -> Self {
        Self {
            services,
            dispatcher,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Serve one request from stdin to stdout.
    pub fn run(&self) -> io::Result<()> {
        self.run_with_io(&mut io::stdin().lock(), &mut io::stdout().lock())
    }

    /// Serve one request with custom I/O (for testing).
    pub fn run_with_io<R: BufRead, W: Write>(&self, reader: &mut R, writer: &mut W) -> io::Result<()> {
        let request = match self.read_request(reader) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejecting malformed request");
                let response = ApiResponse::error(String::new(), e);
                return self.write_response(writer, &response);
            }
        };

        tracing::info!(
            request_id = %request.request_id,
            method = %request.method,
            resource = %request.resource,
            verb = request.verb.as_deref().unwrap_or(""),
            "Request received"
        );

        let response = match self.check_body(&request) {
            Ok(body_length) => {
                let mut body = reader.take(body_length);
                self.dispatcher.dispatch(&self.services, &request, &mut body)
            }
            Err(e) => ApiResponse::error(request.request_id.clone(), e),
        };

        tracing::info!(request_id = %response.request_id, status = response.status, "Request completed");
        self.write_response(writer, &response)
    }

    /// Read and parse the header line.
    fn read_request<R: BufRead>(&self, reader: &mut R) -> Result<ApiRequest, ApiError> {
        let mut line = String::new();
        let n = reader
            .by_ref()
            .take(MAX_HEADER_BYTES)
            .read_line(&mut line)
            .map_err(|e| ApiError::invalid_request(format!("failed to read request: {}", e)))?;

        if n == 0 {
            return Err(ApiError::invalid_request("empty request"));
        }
        if !line.ends_with('\n') && n as u64 >= MAX_HEADER_BYTES {
            return Err(ApiError::invalid_request("request header too long"));
        }

        serde_json::from_str(&line).map_err(|e| ApiError::invalid_request(format!("invalid JSON: {}", e)))
    }

    /// Body length the request announces, checked against its method.
    fn check_body(&self, request: &ApiRequest) -> Result<u64, ApiError> {
        match (request.method.has_body(), request.body_length) {
            (true, Some(n)) => Ok(n),
            (true, None) => Err(ApiError::invalid_request("missing body_length")),
            (false, None) | (false, Some(0)) => Ok(0),
            (false, Some(_)) => Err(ApiError::invalid_request(format!(
                "{} requests carry no body",
                request.method
            ))),
        }
    }

    fn write_response<W: Write>(&self, writer: &mut W, response: &ApiResponse) -> io::Result<()> {
        let json = serde_json::to_string(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::context::SecurityContext;
    use crate::keystore::KeyStore;
    use std::io::Cursor;
    use syncany_protocol::ErrorCode;

    struct Harness {
        _tmp: tempfile::TempDir,
        handler: RpcHandler,
    }

    fn harness() -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            upload_root: tmp.path().join("upload"),
            dist_root: tmp.path().join("dist"),
            release_index_path: tmp.path().join("releases.json"),
            links_path: tmp.path().join("links.json"),
            base_url: "https://get.example.org".to_string(),
            ..ServerConfig::default()
        };
        let keys = KeyStore::from_secrets([(SecurityContext::new("application-put").unwrap(), "k")]);
        let services = Services::with_keys(config, keys).unwrap();
        Harness {
            _tmp: tmp,
            handler: RpcHandler::new(services),
        }
    }

    fn run(handler: &RpcHandler, input: &[u8]) -> ApiResponse {
        let mut reader = Cursor::new(input.to_vec());
        let mut output = Vec::new();
        handler.run_with_io(&mut reader, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_invalid_json() {
        let h = harness();
        let response = run(&h.handler, b"not json\n");
        assert!(!response.ok);
        assert_eq!(response.status, 400);
        assert_eq!(response.request_id, "");
    }

    #[test]
    fn test_empty_input() {
        let h = harness();
        let response = run(&h.handler, b"");
        assert_eq!(response.error.unwrap().code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_put_requires_body_length() {
        let h = harness();
        let response = run(&h.handler, br#"{"request_id":"r1","method":"PUT","resource":"app"}
"#);
        assert_eq!(response.request_id, "r1");
        assert_eq!(response.error.unwrap().code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_get_with_body_rejected() {
        let h = harness();
        let response = run(
            &h.handler,
            br#"{"request_id":"r1","method":"GET","resource":"app","body_length":3}
abc"#,
        );
        assert_eq!(response.error.unwrap().code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_unknown_resource() {
        let h = harness();
        let response = run(&h.handler, br#"{"request_id":"r2","method":"GET","resource":"plugins"}
"#);
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_empty_release_list_is_no_content() {
        let h = harness();
        let response = run(&h.handler, br#"{"request_id":"r3","method":"GET","resource":"app"}
"#);
        assert!(response.ok);
        assert_eq!(response.status, 204);
    }

    #[test]
    fn test_unsigned_upload_is_unauthorized() {
        let h = harness();
        let response = run(
            &h.handler,
            br#"{"request_id":"r4","method":"PUT","resource":"app","args":{"filename":"x.zip"},"body_length":3}
abc"#,
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::Unauthorized);
        assert_eq!(error.message, "Authentication failed");
        assert!(!h._tmp.path().join("upload").join("application-put").exists());
    }

    #[test]
    fn test_link_round_trip() {
        let h = harness();
        let response = run(
            &h.handler,
            br#"{"request_id":"r5","method":"POST","resource":"links","verb":"add","args":{"l":"syncany://storage/1/abc"}}
"#,
        );
        assert!(response.ok);
        let id = response.payload.unwrap()["short_link_id"].as_str().unwrap().to_string();

        let request = format!(
            "{{\"request_id\":\"r6\",\"method\":\"GET\",\"resource\":\"links\",\"path_args\":[\"{}\"]}}\n",
            id
        );
        let response = run(&h.handler, request.as_bytes());
        assert_eq!(response.payload.unwrap()["location"], "syncany://storage/1/abc");

        let response = run(
            &h.handler,
            br#"{"request_id":"r7","method":"GET","resource":"links","args":{"l":"zzzzzzz"}}
"#,
        );
        assert_eq!(response.status, 404);
    }
}
