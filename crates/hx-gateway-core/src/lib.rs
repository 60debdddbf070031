//! `hx-gateway-core` — kernel contracts for the HX API gateway.
//!
//! This crate defines the *data types and trait interfaces* the gateway
//! pipeline is built from.  No concrete stage implementations live here —
//! those belong in `hx-gateway` (the runtime crate).
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              hx-gateway-core  (this crate)                  │
//! │  Stage trait            DependencyProbe trait               │
//! │  RequestContext         GatewayRequest / GatewayResponse    │
//! │  ModelDescriptor / RequestFeatures / RoutingPolicy          │
//! │  GatewayError                                               │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              hx-gateway  (runtime crate)                    │
//! │  SecurityStage / ValidationStage / TransformStage           │
//! │  RoutingStage + ModelSelector     ExecutionStage            │
//! │  Pipeline (orchestrator)   GatewayServer (axum)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod error;
pub mod model;
pub mod stage;
pub mod types;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use context::RequestContext;
pub use error::GatewayError;
pub use model::{ModelDescriptor, ModelRegistry, RequestFeatures, RoutingPolicy};
pub use stage::{DependencyProbe, Stage};
pub use types::{GatewayRequest, GatewayResponse, HttpMethod};
