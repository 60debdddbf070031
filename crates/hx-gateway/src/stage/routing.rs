//! Model-routing stage for chat-completion requests.
//!
//! Loads the registry and routing policy lazily, picks a model for bodies
//! that do not name one, and re-serializes the body into
//! `ctx.normalized_body` for the execution stage.  An explicit `model`
//! string from the caller always wins over auto-routing.

use crate::routing::{ModelSelector, RoutingTables, Tables};
use async_trait::async_trait;
use hx_gateway_core::{
    GatewayError, GatewayRequest, GatewayResponse, RequestContext, RequestFeatures, Stage,
};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

const CHAT_COMPLETIONS_PREFIX: &str = "/v1/chat/completions";

/// Floor for the token estimate; short prompts still reserve headroom for
/// the completion.
const MIN_ESTIMATED_TOKENS: u64 = 512;

/// Rough bytes-per-token ratio for the payload-size estimate.
const BYTES_PER_TOKEN: u64 = 4;

/// Auto-routing stage for the chat-completions endpoint family.
pub struct RoutingStage {
    tables: RoutingTables,
    selector: ModelSelector,
    max_body_size: usize,
}

impl RoutingStage {
    /// Stage backed by YAML documents in `cfg_dir`, loaded on first use.
    pub fn new(cfg_dir: PathBuf, max_body_size: usize) -> Self {
        Self {
            tables: RoutingTables::new(cfg_dir),
            selector: ModelSelector::new(),
            max_body_size,
        }
    }

    /// Stage with pre-populated tables (tests, embedded deployments).
    pub fn with_tables(tables: Tables, max_body_size: usize) -> Self {
        Self {
            tables: RoutingTables::preloaded(tables),
            selector: ModelSelector::new(),
            max_body_size,
        }
    }

    /// Derive the per-request feature vector.  Computed fresh every time —
    /// nothing here is cached across requests.
    fn features_for(req: &GatewayRequest) -> RequestFeatures {
        let estimated_tokens =
            (req.body.len() as u64 / BYTES_PER_TOKEN).max(MIN_ESTIMATED_TOKENS);
        RequestFeatures::new(
            estimated_tokens,
            1.0,
            req.header("x-hx-domain").map(str::to_string),
        )
    }
}

#[async_trait]
impl Stage for RoutingStage {
    fn name(&self) -> &str {
        "routing"
    }

    async fn process(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        if !ctx.request.path.starts_with(CHAT_COMPLETIONS_PREFIX) {
            return Ok(());
        }

        let tables = self.tables.get().await;

        // Cap the body before parsing to bound memory use.
        if ctx.request.body.len() > self.max_body_size {
            warn!(
                request_id = %ctx.request.id,
                size = ctx.request.body.len(),
                max = self.max_body_size,
                "request body too large for routing"
            );
            ctx.short_circuit(GatewayResponse::error(
                413,
                "Payload too large for routing processing",
                "invalid_request_error",
                "payload_too_large",
            ));
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
                debug!(request_id = %ctx.request.id, error = %err, "routing body is not valid JSON");
                ctx.short_circuit(GatewayResponse::error(
                    400,
                    "Invalid JSON in request body",
                    "invalid_request_error",
                    "invalid_json",
                ));
                return Ok(());
            }
        };

        let Value::Object(mut payload) = payload else {
            ctx.short_circuit(GatewayResponse::error(
                400,
                "Request body must be a JSON object",
                "invalid_request_error",
                "invalid_body",
            ));
            return Ok(());
        };

        // Explicit caller intent always wins over auto-routing.
        if payload.get("model").is_some_and(Value::is_string) {
            ctx.normalized_body = Some(serde_json::to_vec(&payload)?);
            return Ok(());
        }

        let group = ctx
            .request
            .header("x-hx-model-group")
            .unwrap_or(&tables.policy.default_group)
            .to_string();
        let candidates = tables.registry.candidates_for_group(&group);
        let features = Self::features_for(&ctx.request);

        match self.selector.select(&candidates, &features) {
            Some(model) => {
                // resolved_id is Some by selector contract.
                if let Some(id) = model.resolved_id() {
                    debug!(
                        request_id = %ctx.request.id,
                        group = %group,
                        model = %id,
                        estimated_tokens = features.estimated_tokens,
                        "model selected"
                    );
                    payload.insert("model".to_string(), Value::String(id.to_string()));
                }
            }
            None => match tables.policy.failover_order.first() {
                Some(fallback) => {
                    warn!(
                        request_id = %ctx.request.id,
                        group = %group,
                        fallback = %fallback,
                        "no eligible candidate; using failover order"
                    );
                    payload.insert("model".to_string(), Value::String(fallback.clone()));
                }
                // No failover configured: leave the model field out
                // entirely rather than injecting a null.
                None => warn!(
                    request_id = %ctx.request.id,
                    group = %group,
                    "no eligible candidate and no failover order; forwarding without a model"
                ),
            },
        }

        ctx.normalized_body = Some(serde_json::to_vec(&payload)?);
        Ok(())
    }
}
