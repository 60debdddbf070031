//! Core HTTP primitives shared across all pipeline stages.
//!
//! These types carry no runtime dependencies beyond `serde` and `std` so the
//! runtime crate, tests, and any future adapter crates can all speak the same
//! vocabulary.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP method
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, covering the standard verbs used in REST and proxy scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound request flowing through the gateway pipeline.
///
/// All fields use owned, allocation-friendly types so the struct can be sent
/// across async task boundaries without lifetime complications.  The body is
/// read from the transport exactly once at ingress and cached here; stages
/// must read from this cache instead of re-reading a consumed stream.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Unique identifier for correlating this request across logs.
    pub id: String,
    /// Request path, e.g. `/v1/chat/completions`.
    pub path: String,
    /// Raw query string without the leading `?`, if any.
    pub query: Option<String>,
    /// HTTP method.
    pub method: HttpMethod,
    /// HTTP headers (header names are lowercased).
    pub headers: HashMap<String, String>,
    /// Raw body bytes, cached at ingress.
    pub body: Vec<u8>,
    /// Transport-layer peer address, when known.  This is the only trusted
    /// source for client-identity headers — never inbound headers.
    pub peer_addr: Option<SocketAddr>,
}

impl GatewayRequest {
    /// Construct a minimal request with the given id, path, and method.
    pub fn new(id: impl Into<String>, path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            query: None,
            method,
            headers: HashMap::new(),
            body: Vec::new(),
            peer_addr: None,
        }
    }

    /// Builder helper: attach a header (name lowercased).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builder helper: set the query string.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Builder helper: record the transport peer address.
    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Look up a header by lowercased name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// A response emitted by a pipeline stage and returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    /// HTTP status code (100–599).
    pub status: u16,
    /// Response headers (names lowercased).
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl GatewayResponse {
    /// Construct a minimal response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Builder helper: attach a header (name lowercased).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Build a structured JSON error response in the OpenAI-compatible shape:
    ///
    /// ```json
    /// {"error": {"message": "...", "type": "...", "code": "..."}}
    /// ```
    pub fn error(status: u16, message: &str, error_type: &str, code: &str) -> Self {
        let body = json!({
            "error": {
                "message": message,
                "type": error_type,
                "code": code,
            }
        });
        Self::new(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string().into_bytes())
    }

    /// Look up a header by lowercased name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::from_str_ci("post"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::from_str_ci("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_str_ci("TRACE"), None);
    }

    #[test]
    fn request_headers_are_lowercased() {
        let req = GatewayRequest::new("r1", "/v1/models", HttpMethod::Get)
            .with_header("X-HX-Model-Group", "fast");
        assert_eq!(req.header("x-hx-model-group"), Some("fast"));
    }

    #[test]
    fn error_response_has_structured_body() {
        let resp = GatewayResponse::error(502, "Bad Gateway", "gateway_error", "bad_gateway");
        let v: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(v["error"]["code"], "bad_gateway");
        assert_eq!(v["error"]["type"], "gateway_error");
        assert_eq!(resp.header("content-type"), Some("application/json"));
    }
}
