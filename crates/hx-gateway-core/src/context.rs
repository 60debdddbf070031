//! Per-request context threaded through the stage pipeline.

use crate::types::{GatewayRequest, GatewayResponse};

/// Mutable state for a single request, owned by the pipeline orchestrator
/// and passed by `&mut` to each stage in turn.
///
/// A context is created at ingress, mutated strictly sequentially by the
/// stages, and dropped when the final response is emitted.  Nothing here
/// outlives the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The inbound request, with its body cached at ingress.
    pub request: GatewayRequest,
    /// Terminal response.  Set at most once: the first stage to write it
    /// wins and ends the pipeline (see [`short_circuit`](Self::short_circuit)).
    pub response: Option<GatewayResponse>,
    /// Body rewritten by the routing stage (model injection).
    pub normalized_body: Option<Vec<u8>>,
    /// Body rewritten by the transform stage (field aliasing).  Takes
    /// precedence over `normalized_body` when both are set.
    pub transformed_body: Option<Vec<u8>>,
}

impl RequestContext {
    /// Create a fresh context from an inbound request.
    pub fn new(request: GatewayRequest) -> Self {
        Self {
            request,
            response: None,
            normalized_body: None,
            transformed_body: None,
        }
    }

    /// Attach a terminal response, ending the pipeline.
    ///
    /// The first writer wins: if a response is already set, the new one is
    /// discarded.  This keeps the short-circuit contract intact even if a
    /// buggy stage runs after a rejection.
    pub fn short_circuit(&mut self, response: GatewayResponse) {
        if self.response.is_none() {
            self.response = Some(response);
        }
    }

    /// Whether a stage has already produced a terminal response.
    pub fn is_terminated(&self) -> bool {
        self.response.is_some()
    }

    /// The body the execution stage must forward upstream:
    /// transformed > normalized > original.
    pub fn outbound_body(&self) -> &[u8] {
        self.transformed_body
            .as_deref()
            .or(self.normalized_body.as_deref())
            .unwrap_or(&self.request.body)
    }
}
