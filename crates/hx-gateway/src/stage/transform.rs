//! Embedding-request body normalization stage.
//!
//! OpenAI-style embedding requests use `input`; some callers send `prompt`
//! instead.  For `POST /v1/embeddings` only, this stage renames a lone
//! `prompt` field to `input`.  The rewrite goes into
//! `ctx.transformed_body`; the cached original body is never mutated, and
//! applying the transform to its own output is a no-op.

use async_trait::async_trait;
use hx_gateway_core::{GatewayError, GatewayResponse, HttpMethod, RequestContext, Stage};
use serde_json::Value;
use tracing::debug;

const EMBEDDINGS_PATH: &str = "/v1/embeddings";

/// Field-aliasing stage for embedding requests.
#[derive(Default)]
pub struct TransformStage;

impl TransformStage {
    pub fn new() -> Self {
        Self
    }

    /// Apply the aliasing rule to a parsed body, returning the rewritten
    /// object when a change was made.  Idempotent by construction: once
    /// `input` exists the rule no longer fires.
    fn rename_prompt_to_input(payload: &Value) -> Option<Value> {
        let obj = payload.as_object()?;
        if !obj.contains_key("prompt") || obj.contains_key("input") {
            return None;
        }
        let mut rewritten = obj.clone();
        let prompt = rewritten.remove("prompt")?;
        rewritten.insert("input".to_string(), prompt);
        Some(Value::Object(rewritten))
    }
}

#[async_trait]
impl Stage for TransformStage {
    fn name(&self) -> &str {
        "transform"
    }

    async fn process(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        if ctx.request.path != EMBEDDINGS_PATH || ctx.request.method != HttpMethod::Post {
            return Ok(());
        }

        let body = if ctx.request.body.is_empty() {
            b"{}".as_slice()
        } else {
            &ctx.request.body
        };

        let payload: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(err) => {
                // Parser detail stays server-side.
                debug!(
                    request_id = %ctx.request.id,
                    error = %err,
                    "embedding body is not valid JSON"
                );
                ctx.short_circuit(GatewayResponse::error(
                    400,
                    "Request body is not valid JSON",
                    "invalid_request_error",
                    "invalid_json",
                ));
                return Ok(());
            }
        };

        if let Some(rewritten) = Self::rename_prompt_to_input(&payload) {
            ctx.transformed_body = Some(serde_json::to_vec(&rewritten)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hx_gateway_core::GatewayRequest;

    fn ctx(path: &str, method: HttpMethod, body: &[u8]) -> RequestContext {
        RequestContext::new(GatewayRequest::new("r1", path, method).with_body(body.to_vec()))
    }

    async fn run(body: &[u8]) -> RequestContext {
        let mut c = ctx(EMBEDDINGS_PATH, HttpMethod::Post, body);
        TransformStage::new().process(&mut c).await.unwrap();
        c
    }

    #[tokio::test]
    async fn prompt_is_renamed_to_input() {
        let c = run(br#"{"model":"m","prompt":"hi"}"#).await;
        let v: Value = serde_json::from_slice(c.transformed_body.as_ref().unwrap()).unwrap();
        assert_eq!(v["input"], "hi");
        assert_eq!(v["model"], "m");
        assert!(v.get("prompt").is_none());
        // Cached original is untouched.
        assert!(String::from_utf8_lossy(&c.request.body).contains("prompt"));
    }

    #[tokio::test]
    async fn transform_is_idempotent() {
        let first = run(br#"{"model":"m","prompt":"hi"}"#).await;
        let once = first.transformed_body.unwrap();

        // Feed the output back through: the rule must not fire again.
        let second = run(&once).await;
        assert!(second.transformed_body.is_none());
        let v: Value = serde_json::from_slice(&once).unwrap();
        assert_eq!(v["input"], "hi");
    }

    #[tokio::test]
    async fn body_with_input_already_present_is_untouched() {
        let c = run(br#"{"input":"hi","prompt":"legacy"}"#).await;
        assert!(c.transformed_body.is_none());
    }

    #[tokio::test]
    async fn malformed_json_returns_400() {
        let c = run(b"{not json").await;
        let resp = c.response.unwrap();
        assert_eq!(resp.status, 400);
        let v: Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(v["error"]["code"], "invalid_json");
    }

    #[tokio::test]
    async fn other_paths_and_methods_pass_through() {
        let mut c = ctx("/v1/chat/completions", HttpMethod::Post, br#"{"prompt":"x"}"#);
        TransformStage::new().process(&mut c).await.unwrap();
        assert!(c.transformed_body.is_none() && c.response.is_none());

        let mut c = ctx(EMBEDDINGS_PATH, HttpMethod::Get, br#"{"prompt":"x"}"#);
        TransformStage::new().process(&mut c).await.unwrap();
        assert!(c.transformed_body.is_none() && c.response.is_none());
    }

    #[tokio::test]
    async fn empty_body_is_treated_as_empty_object() {
        let c = run(b"").await;
        assert!(c.response.is_none());
        assert!(c.transformed_body.is_none());
    }
}
