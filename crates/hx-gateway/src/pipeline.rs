//! Pipeline orchestrator.
//!
//! [`Pipeline`] runs an explicit, injected list of stages strictly in order
//! against a fresh [`RequestContext`] and stops at the first stage that
//! attaches a response.  No behavior is patched in at runtime: the stage
//! list given to [`Pipeline::new`] is final.

use crate::config::GatewaySettings;
use crate::stage::{
    ExecutionStage, RoutingStage, SecurityStage, TransformStage, ValidationStage,
};
use hx_gateway_core::{GatewayError, GatewayRequest, GatewayResponse, RequestContext, Stage};
use std::sync::Arc;
use tracing::error;

/// Ordered chain of stages applied to every inbound request.
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// Build a pipeline from an explicit ordered stage list.
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Build the standard stage chain from runtime settings:
    /// Security → Validation → Transform → Routing → Execution.
    ///
    /// A DB-guard stage, when deployed, is inserted between Security and
    /// Validation by constructing the chain manually via [`Pipeline::new`].
    pub fn from_settings(settings: &GatewaySettings) -> Result<Self, GatewayError> {
        Ok(Self::new(vec![
            Arc::new(SecurityStage::new(
                settings.master_key.clone(),
                settings.allow_dev_key,
            )?),
            Arc::new(ValidationStage::new()),
            Arc::new(TransformStage::new()),
            Arc::new(RoutingStage::new(
                settings.cfg_dir.clone(),
                settings.max_routing_body,
            )),
            Arc::new(ExecutionStage::new(
                &settings.upstream_base,
                settings.upstream_key.clone(),
                settings.trust_proxy_ip,
                settings.timeouts,
            )?),
        ]))
    }

    /// Run the request through the stage chain and produce the response.
    ///
    /// Contract with stages: client-visible failures are attached to the
    /// context as responses; an `Err` return is an internal defect and is
    /// converted here into a generic non-leaking 500, with full detail
    /// logged server-side only.
    pub async fn process(&self, request: GatewayRequest) -> GatewayResponse {
        let request_id = request.id.clone();
        let mut ctx = RequestContext::new(request);

        for stage in &self.stages {
            if let Err(err) = stage.process(&mut ctx).await {
                error!(
                    request_id = %request_id,
                    stage = stage.name(),
                    error = %err,
                    "stage failed with an internal error"
                );
                return GatewayResponse::error(
                    500,
                    "Internal gateway error",
                    "gateway_error",
                    "internal_error",
                );
            }
            if ctx.is_terminated() {
                break;
            }
        }

        ctx.response.take().unwrap_or_else(|| {
            // The execution stage is terminal; reaching this point means a
            // misconfigured chain rather than an upstream problem.
            error!(request_id = %request_id, "no stage produced a response");
            GatewayResponse::error(502, "Bad Gateway", "gateway_error", "bad_gateway")
        })
    }
}
