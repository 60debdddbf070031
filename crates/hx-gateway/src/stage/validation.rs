//! HTTP method validation stage.
//!
//! Applies only under the upstream API prefix.  Read-only endpoints accept
//! GET and HEAD in addition to POST; every other endpoint under the prefix
//! is write-only and requires POST.  Pure function of method + path — the
//! body is never touched.

use async_trait::async_trait;
use hx_gateway_core::{GatewayError, GatewayResponse, HttpMethod, RequestContext, Stage};
use std::collections::HashSet;

const API_PREFIX: &str = "/v1/";

/// Method-policy stage for the upstream API surface.
pub struct ValidationStage {
    read_only_paths: HashSet<String>,
}

impl ValidationStage {
    /// Build the stage with the standard read-only set (`/v1/models`).
    pub fn new() -> Self {
        Self {
            read_only_paths: HashSet::from(["/v1/models".to_string()]),
        }
    }

    fn method_not_allowed(allow: &str) -> GatewayResponse {
        GatewayResponse::error(
            405,
            "Method Not Allowed",
            "invalid_request_error",
            "method_not_allowed",
        )
        .with_header("allow", allow)
    }
}

impl Default for ValidationStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &str {
        "validation"
    }

    async fn process(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        let path = &ctx.request.path;
        if !path.starts_with(API_PREFIX) {
            return Ok(());
        }

        let method = ctx.request.method;
        if self.read_only_paths.contains(path) {
            if !matches!(method, HttpMethod::Get | HttpMethod::Head | HttpMethod::Post) {
                ctx.short_circuit(Self::method_not_allowed("GET, HEAD, POST"));
            }
        } else if method != HttpMethod::Post {
            ctx.short_circuit(Self::method_not_allowed("POST"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hx_gateway_core::GatewayRequest;

    fn ctx(path: &str, method: HttpMethod) -> RequestContext {
        RequestContext::new(GatewayRequest::new("r1", path, method))
    }

    #[tokio::test]
    async fn get_on_write_endpoint_returns_405_allow_post() {
        let mut c = ctx("/v1/chat/completions", HttpMethod::Get);
        ValidationStage::new().process(&mut c).await.unwrap();
        let resp = c.response.unwrap();
        assert_eq!(resp.status, 405);
        assert_eq!(resp.header("allow"), Some("POST"));
    }

    #[tokio::test]
    async fn get_and_head_on_read_only_endpoint_pass() {
        for method in [HttpMethod::Get, HttpMethod::Head, HttpMethod::Post] {
            let mut c = ctx("/v1/models", method);
            ValidationStage::new().process(&mut c).await.unwrap();
            assert!(c.response.is_none(), "{} should pass", method.as_str());
        }
    }

    #[tokio::test]
    async fn delete_on_read_only_endpoint_returns_405_with_full_allow() {
        let mut c = ctx("/v1/models", HttpMethod::Delete);
        ValidationStage::new().process(&mut c).await.unwrap();
        let resp = c.response.unwrap();
        assert_eq!(resp.status, 405);
        assert_eq!(resp.header("allow"), Some("GET, HEAD, POST"));
    }

    #[tokio::test]
    async fn paths_outside_api_prefix_are_ignored() {
        let mut c = ctx("/healthz", HttpMethod::Get);
        ValidationStage::new().process(&mut c).await.unwrap();
        assert!(c.response.is_none());
    }
}
