//! Gateway error types.
//!
//! [`GatewayError`] covers construction-time failures (missing secret,
//! invalid upstream configuration) and internal defects surfaced by stages.
//! Client-visible failures (401, 405, 4xx/5xx upstream mappings) are *not*
//! errors — stages attach them to the context as responses and return
//! normally.

use thiserror::Error;

/// Error type for gateway construction and internal stage defects.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// No master key configured and the development fallback is not enabled.
    #[error(
        "no master key configured: set HX_MASTER_KEY or MASTER_KEY, \
         or set HX_ALLOW_DEV_KEY=true for development"
    )]
    MissingMasterKey,

    /// A component was constructed with an invalid setting.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Re-serializing a request body failed — a programming error, since the
    /// value was parsed from JSON moments earlier.
    #[error("body serialization failed: {0}")]
    BodyEncoding(#[from] serde_json::Error),

    /// Catch-all for defects that must never leak detail to the client.
    #[error("internal gateway error: {0}")]
    Internal(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
