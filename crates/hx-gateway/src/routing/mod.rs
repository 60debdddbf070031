//! Model-routing subsystem: selection signals, the scoring selector, and
//! the lazily loaded registry/policy tables.

mod features;
mod selector;
mod tables;

pub use features::{NoSignals, SelectionSignals};
pub use selector::ModelSelector;
pub use tables::{RoutingTables, Tables};
