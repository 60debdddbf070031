//! Upstream execution stage.
//!
//! Terminal stage: forwards the request to the configured upstream and
//! always attaches a response — an upstream result, a 504 on timeout, or a
//! 502 on any other transport failure.  No retries; retry policy belongs to
//! the caller or an external collaborator.

use crate::config::UpstreamTimeouts;
use async_trait::async_trait;
use hx_gateway_core::{
    GatewayError, GatewayRequest, GatewayResponse, HttpMethod, RequestContext, Stage,
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Connection-scoped headers that must not be re-issued on a new connection.
const HOP_BY_HOP_HEADERS: [&str; 10] = [
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
    "keep-alive",
    "upgrade",
    "te",
    "trailer",
    "proxy-authenticate",
    "proxy-authorization",
];

/// Caller credentials and spoofable proxy-identity headers, stripped so
/// they never reach the upstream.
const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];
const SENSITIVE_PREFIXES: [&str; 2] = ["x-forwarded-", "cf-"];

/// Baseline security headers added to responses when upstream did not set
/// them.
const DEFAULT_SECURITY_HEADERS: [(&str, &str); 3] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
];

/// Forwards requests to the upstream inference service.
pub struct ExecutionStage {
    client: Client,
    base_url: String,
    upstream_key: Option<String>,
    trust_proxy_ip: bool,
}

impl ExecutionStage {
    /// Build the stage with a shared client configured for split-phase
    /// timeouts: short connect (fail fast on transport problems), generous
    /// read (inference latency), bounded total.
    pub fn new(
        base_url: &str,
        upstream_key: Option<String>,
        trust_proxy_ip: bool,
        timeouts: UpstreamTimeouts,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .timeout(timeouts.total)
            .build()
            .map_err(|e| GatewayError::InvalidConfig(format!("upstream client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            upstream_key,
            trust_proxy_ip,
        })
    }

    fn is_hop_by_hop(name: &str) -> bool {
        HOP_BY_HOP_HEADERS.contains(&name)
    }

    fn is_sensitive(name: &str) -> bool {
        SENSITIVE_HEADERS.contains(&name)
            || SENSITIVE_PREFIXES.iter().any(|p| name.starts_with(p))
    }

    /// Compute the outbound header set: inbound headers minus hop-by-hop
    /// and sensitive entries, plus the injected upstream credential and,
    /// when the network position is trusted, the transport-derived client
    /// IP.  Header names are already lowercased on the request.
    fn outbound_headers(&self, req: &GatewayRequest) -> HashMap<String, String> {
        let mut headers: HashMap<String, String> = req
            .headers
            .iter()
            .filter(|(name, _)| !Self::is_hop_by_hop(name) && !Self::is_sensitive(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        if let Some(key) = &self.upstream_key {
            headers.insert("authorization".to_string(), format!("Bearer {key}"));
        }

        // Strictly transport-derived; never taken from inbound headers,
        // which a caller could spoof.
        if self.trust_proxy_ip {
            if let Some(peer) = req.peer_addr {
                headers.insert("x-hx-client-ip".to_string(), peer.ip().to_string());
            }
        }
        headers
    }

    fn outbound_url(&self, req: &GatewayRequest) -> String {
        match &req.query {
            Some(q) => format!("{}{}?{}", self.base_url, req.path, q),
            None => format!("{}{}", self.base_url, req.path),
        }
    }

    /// Finalize an upstream response: strip hop-by-hop headers, add the
    /// baseline security headers only where upstream left them unset, and
    /// default the CSP by content type.
    fn shape_response(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> GatewayResponse {
        let mut resp = GatewayResponse::new(status).with_body(body);
        resp.headers = headers
            .into_iter()
            .filter(|(name, _)| !Self::is_hop_by_hop(name))
            .collect();

        for (name, value) in DEFAULT_SECURITY_HEADERS {
            resp.headers
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }

        if !resp.headers.contains_key("content-security-policy") {
            let is_html = resp
                .header("content-type")
                .is_some_and(|ct| ct.to_lowercase().contains("text/html"));
            let csp = if is_html {
                "default-src 'self'"
            } else {
                "default-src 'none'"
            };
            resp.headers
                .insert("content-security-policy".to_string(), csp.to_string());
        }
        resp
    }

    fn timeout_response() -> GatewayResponse {
        GatewayResponse::error(
            504,
            "Upstream request timed out",
            "upstream_error",
            "upstream_timeout",
        )
    }

    fn unreachable_response() -> GatewayResponse {
        GatewayResponse::error(
            502,
            "Upstream is unreachable",
            "upstream_error",
            "upstream_unreachable",
        )
    }
}

#[async_trait]
impl Stage for ExecutionStage {
    fn name(&self) -> &str {
        "execution"
    }

    async fn process(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        let url = self.outbound_url(&ctx.request);
        let method = match ctx.request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            // HttpMethod is non_exhaustive; new verbs forward as POST.
            _ => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &url);
        for (name, value) in self.outbound_headers(&ctx.request) {
            builder = builder.header(name, value);
        }

        let body = ctx.outbound_body();
        if matches!(
            ctx.request.method,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch
        ) && !body.is_empty()
        {
            builder = builder
                .header("content-type", "application/json")
                .body(body.to_vec());
        }

        let start = Instant::now();
        let upstream = match builder.send().await {
            Ok(r) => r,
            Err(err) => {
                warn!(
                    request_id = %ctx.request.id,
                    url = %url,
                    error = %err,
                    timeout = err.is_timeout(),
                    "upstream call failed"
                );
                ctx.short_circuit(if err.is_timeout() {
                    Self::timeout_response()
                } else {
                    Self::unreachable_response()
                });
                return Ok(());
            }
        };

        let status = upstream.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in upstream.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_string(), v.to_string());
            }
        }

        let body = match upstream.bytes().await {
            Ok(b) => b.to_vec(),
            Err(err) => {
                warn!(
                    request_id = %ctx.request.id,
                    url = %url,
                    error = %err,
                    "failed reading upstream body"
                );
                ctx.short_circuit(if err.is_timeout() {
                    Self::timeout_response()
                } else {
                    Self::unreachable_response()
                });
                return Ok(());
            }
        };

        debug!(
            request_id = %ctx.request.id,
            status = status,
            latency_ms = start.elapsed().as_millis() as u64,
            "upstream response relayed"
        );
        ctx.short_circuit(Self::shape_response(status, headers, body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn stage(base: &str, key: Option<&str>, trust: bool) -> ExecutionStage {
        ExecutionStage::new(
            base,
            key.map(str::to_string),
            trust,
            UpstreamTimeouts::default(),
        )
        .unwrap()
    }

    fn request() -> GatewayRequest {
        GatewayRequest::new("r1", "/v1/chat/completions", HttpMethod::Post)
            .with_header("authorization", "Bearer caller-secret")
            .with_header("cookie", "session=abc")
            .with_header("x-forwarded-for", "1.2.3.4")
            .with_header("cf-connecting-ip", "1.2.3.4")
            .with_header("host", "gateway.local")
            .with_header("content-length", "42")
            .with_header("x-hx-model-group", "fast")
            .with_header("accept", "application/json")
    }

    #[test]
    fn sensitive_and_hop_by_hop_headers_are_stripped() {
        let headers = stage("http://up", None, false).outbound_headers(&request());
        for name in [
            "authorization",
            "cookie",
            "x-forwarded-for",
            "cf-connecting-ip",
            "host",
            "content-length",
        ] {
            assert!(!headers.contains_key(name), "{name} must be stripped");
        }
        assert_eq!(headers.get("accept").map(String::as_str), Some("application/json"));
        assert_eq!(headers.get("x-hx-model-group").map(String::as_str), Some("fast"));
    }

    #[test]
    fn upstream_credential_replaces_caller_credential() {
        let headers = stage("http://up", Some("sk-upstream"), false).outbound_headers(&request());
        assert_eq!(
            headers.get("authorization").map(String::as_str),
            Some("Bearer sk-upstream")
        );
    }

    #[test]
    fn client_ip_comes_only_from_the_transport_peer() {
        let peer: SocketAddr = "10.0.0.9:52000".parse().unwrap();
        let req = request().with_peer_addr(peer);

        let trusted = stage("http://up", None, true).outbound_headers(&req);
        assert_eq!(trusted.get("x-hx-client-ip").map(String::as_str), Some("10.0.0.9"));

        let untrusted = stage("http://up", None, false).outbound_headers(&req);
        assert!(!untrusted.contains_key("x-hx-client-ip"));
    }

    #[test]
    fn url_preserves_path_and_query() {
        let s = stage("http://up:4000/", None, false);
        let req = GatewayRequest::new("r1", "/v1/models", HttpMethod::Get).with_query("limit=5");
        assert_eq!(s.outbound_url(&req), "http://up:4000/v1/models?limit=5");
    }

    #[test]
    fn security_headers_are_added_only_when_absent() {
        let mut upstream_headers = HashMap::new();
        upstream_headers.insert("x-frame-options".to_string(), "SAMEORIGIN".to_string());
        upstream_headers.insert("connection".to_string(), "keep-alive".to_string());
        let resp = ExecutionStage::shape_response(200, upstream_headers, Vec::new());

        assert_eq!(resp.header("x-frame-options"), Some("SAMEORIGIN"));
        assert_eq!(resp.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(resp.header("referrer-policy"), Some("no-referrer"));
        assert!(resp.header("connection").is_none());
    }

    #[test]
    fn csp_defaults_by_content_type() {
        let mut html = HashMap::new();
        html.insert("content-type".to_string(), "text/html; charset=utf-8".to_string());
        let resp = ExecutionStage::shape_response(200, html, Vec::new());
        assert_eq!(resp.header("content-security-policy"), Some("default-src 'self'"));

        let mut json = HashMap::new();
        json.insert("content-type".to_string(), "application/json".to_string());
        let resp = ExecutionStage::shape_response(200, json, Vec::new());
        assert_eq!(resp.header("content-security-policy"), Some("default-src 'none'"));

        let mut preset = HashMap::new();
        preset.insert(
            "content-security-policy".to_string(),
            "default-src https:".to_string(),
        );
        let resp = ExecutionStage::shape_response(200, preset, Vec::new());
        assert_eq!(resp.header("content-security-policy"), Some("default-src https:"));
    }

    #[tokio::test]
    async fn refused_connection_maps_to_502_unreachable() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let s = stage(&format!("http://{addr}"), None, false);
        let mut ctx = RequestContext::new(
            GatewayRequest::new("r1", "/v1/models", HttpMethod::Get),
        );
        s.process(&mut ctx).await.unwrap();
        let resp = ctx.response.unwrap();
        assert_eq!(resp.status, 502);
        assert!(String::from_utf8_lossy(&resp.body).contains("upstream_unreachable"));
    }

    #[tokio::test]
    async fn read_timeout_maps_to_504_upstream_timeout() {
        // Upstream accepts connections but never responds.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    let _hold = socket;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                });
            }
        });

        let timeouts = UpstreamTimeouts {
            connect: Duration::from_secs(2),
            read: Duration::from_millis(200),
            total: Duration::from_millis(500),
        };
        let s = ExecutionStage::new(&format!("http://{addr}"), None, false, timeouts).unwrap();
        let mut ctx = RequestContext::new(
            GatewayRequest::new("r1", "/v1/models", HttpMethod::Get),
        );
        s.process(&mut ctx).await.unwrap();
        let resp = ctx.response.unwrap();
        assert_eq!(resp.status, 504);
        assert!(String::from_utf8_lossy(&resp.body).contains("upstream_timeout"));
    }
}
