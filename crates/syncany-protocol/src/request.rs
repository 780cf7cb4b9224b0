//! API request types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    /// Upper-case method name, as it appears in the canonical string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a body stream.
    pub fn has_body(self) -> bool {
        matches!(self, Self::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("invalid method {}", other)),
        }
    }
}

/// API request envelope.
///
/// The server reads a single JSON header line. For `PUT` requests the line is
/// followed by exactly `body_length` raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Caller-chosen request ID for correlation.
    pub request_id: String,
    /// HTTP method.
    pub method: Method,
    /// Resource name (e.g. `app`, `links`).
    pub resource: String,
    /// Optional sub-verb (e.g. `osxnotifier`, `add`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    /// Positional path arguments following resource and verb.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_args: Vec<String>,
    /// Named arguments, including `signature`, `time` and `rand` when signed.
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    /// Length of the raw body following the header line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_length: Option<u64>,
}

impl ApiRequest {
    /// Create a request without arguments or body.
    pub fn new(request_id: impl Into<String>, method: Method, resource: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            method,
            resource: resource.into(),
            verb: None,
            path_args: Vec::new(),
            args: BTreeMap::new(),
            body_length: None,
        }
    }

    /// Set the sub-verb.
    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = Some(verb.into());
        self
    }

    /// Append a positional path argument.
    pub fn with_path_arg(mut self, arg: impl Into<String>) -> Self {
        self.path_args.push(arg.into());
        self
    }

    /// Set a named argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Get a named argument.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Get a named argument, treating an empty value as absent.
    pub fn non_empty_arg(&self, key: &str) -> Option<&str> {
        self.arg(key).filter(|v| !v.is_empty())
    }
}
