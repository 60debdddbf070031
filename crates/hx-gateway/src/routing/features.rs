//! Dynamic selection signals.
//!
//! The selector's load and performance terms are extensibility hooks: the
//! default implementation contributes nothing, keeping selection a pure
//! function of the registry and the request features.  A deployment wired
//! to live utilization or latency baselines implements
//! [`SelectionSignals`] and injects it into the selector.

use hx_gateway_core::ModelDescriptor;

/// Dynamic per-model scoring adjustments.
pub trait SelectionSignals: Send + Sync {
    /// Current backend utilization penalty in `[0, 1]`.
    /// 0 = idle, 1 = saturated (zeroes out the base score).
    fn load_penalty(&self, _model: &ModelDescriptor) -> f64 {
        0.0
    }

    /// Observed latency/quality bonus in `[-1, +1]`.
    fn performance_bonus(&self, _model: &ModelDescriptor) -> f64 {
        0.0
    }
}

/// Default signals: no dynamic adjustment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignals;

impl SelectionSignals for NoSignals {}
