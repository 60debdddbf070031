//! Stage and dependency-probe trait contracts.
//!
//! A pipeline is an ordered list of [`Stage`] instances applied to every
//! request.  Each stage may mutate the [`RequestContext`]; attaching a
//! response short-circuits the chain:
//!
//! ```text
//! Request ──► Security ──► DbGuard ──► Validation ──► Transform
//!                  ──► Routing ──► Execution ──► Response
//! ```
//!
//! Any stage that can fail must attach a response and return `Ok(())`;
//! returning `Err` is reserved for internal defects, which the orchestrator
//! converts to a generic non-leaking 500.

use crate::context::RequestContext;
use crate::error::GatewayError;
use async_trait::async_trait;

/// Kernel contract for a single stage in the gateway pipeline.
///
/// Implementations must be `Send + Sync` so they can be shared across Tokio
/// tasks without additional synchronization by the caller.  Stages hold no
/// per-request state — everything request-scoped lives in the context.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable, human-readable identifier for this stage (used in logs).
    fn name(&self) -> &str;

    /// Process the request context in place.
    ///
    /// Implementations may read the cached request, write
    /// `normalized_body` / `transformed_body`, or attach a terminal
    /// response via [`RequestContext::short_circuit`].
    async fn process(&self, ctx: &mut RequestContext) -> Result<(), GatewayError>;
}

/// Health probe for a backing dependency (relational store, cache, vector
/// store, …) consulted by the DB-guard stage.
///
/// Implementations live outside this workspace; the gateway only consumes
/// the narrow contract.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    /// Dependency name surfaced in 503 bodies (e.g. `"PostgreSQL"`).
    fn name(&self) -> &str;

    /// Whether the dependency is currently reachable.
    async fn healthy(&self) -> bool;
}
