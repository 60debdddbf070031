//! Concrete pipeline stages.

mod db_guard;
mod execution;
mod routing;
mod security;
mod transform;
mod validation;

pub use db_guard::DbGuardStage;
pub use execution::ExecutionStage;
pub use routing::RoutingStage;
pub use security::SecurityStage;
pub use transform::TransformStage;
pub use validation::ValidationStage;
