//! `hx-gateway` — HX API Gateway runtime.
//!
//! This crate provides the concrete implementations of the pipeline
//! contracts defined in `hx-gateway-core`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`Stage`](hx_gateway_core::Stage) | [`stage::SecurityStage`], [`stage::DbGuardStage`], [`stage::ValidationStage`], [`stage::TransformStage`], [`stage::RoutingStage`], [`stage::ExecutionStage`] |
//! | Selector | [`routing::ModelSelector`] |
//! | Orchestrator | [`pipeline::Pipeline`] |
//!
//! The [`server::GatewayServer`] wires everything together into an axum HTTP
//! service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use hx_gateway::config::GatewaySettings;
//! use hx_gateway::pipeline::Pipeline;
//! use hx_gateway::server::GatewayServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = GatewaySettings::from_env();
//!     let pipeline = Pipeline::from_settings(&settings).expect("gateway construction");
//!     let server = GatewayServer::new(&settings);
//!     server.start(pipeline).await.unwrap();
//! }
//! ```

pub mod config;
pub mod pipeline;
pub mod routing;
pub mod server;
pub mod stage;

// Re-export the kernel types for convenience.
pub use hx_gateway_core as core;
