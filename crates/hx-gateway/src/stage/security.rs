//! Bearer-secret authentication stage.
//!
//! Accepts requests carrying `Authorization: Bearer <token>` where the token
//! matches the configured master key.  The scheme match is case-insensitive,
//! the token comparison is case-sensitive and constant-time.  A fixed set of
//! liveness paths is exempt (exact match, not prefix).

use async_trait::async_trait;
use hx_gateway_core::{GatewayError, GatewayResponse, RequestContext, Stage};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Liveness endpoints served without authentication.
const EXEMPT_PATHS: [&str; 3] = ["/healthz", "/livez", "/readyz"];

/// Development-only fallback key, used exclusively when explicitly enabled.
const DEV_MASTER_KEY: &str = "sk-hx-dev-1234";

/// Authentication stage enforcing the shared-secret bearer check.
pub struct SecurityStage {
    master_key: Vec<u8>,
}

impl SecurityStage {
    /// Build the stage, resolving the master key.
    ///
    /// Resolution policy: an explicitly configured key always wins.  Without
    /// one, construction fails unless `allow_dev_key` is set, in which case
    /// the flagged development key is used and a loud warning is logged.
    pub fn new(master_key: Option<String>, allow_dev_key: bool) -> Result<Self, GatewayError> {
        let key = match master_key {
            Some(k) => k,
            None if allow_dev_key => {
                warn!(
                    "DEVELOPMENT MODE: using the hardcoded development key. \
                     Set HX_MASTER_KEY or MASTER_KEY for production use!"
                );
                DEV_MASTER_KEY.to_string()
            }
            None => return Err(GatewayError::MissingMasterKey),
        };
        Ok(Self {
            master_key: key.into_bytes(),
        })
    }

    /// Extract the bearer token from an `authorization` header value,
    /// matching the scheme case-insensitively and preserving token case.
    fn bearer_token(header: &str) -> Option<&str> {
        let (scheme, token) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }

    fn unauthorized() -> GatewayResponse {
        GatewayResponse::new(401)
            .with_header("www-authenticate", "Bearer")
            .with_header("content-type", "application/json")
            .with_body(br#"{"error":"Unauthorized"}"#.to_vec())
    }
}

#[async_trait]
impl Stage for SecurityStage {
    fn name(&self) -> &str {
        "security"
    }

    async fn process(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        if EXEMPT_PATHS.contains(&ctx.request.path.as_str()) {
            return Ok(());
        }

        let token = ctx.request.header("authorization").and_then(Self::bearer_token);

        let Some(token) = token else {
            warn!(
                request_id = %ctx.request.id,
                path = %ctx.request.path,
                "rejected request: missing or malformed bearer credential"
            );
            ctx.short_circuit(Self::unauthorized());
            return Ok(());
        };

        // Constant-time comparison prevents timing side-channels on the
        // secret's prefix.  `ct_eq` on differing lengths is false.
        if token.as_bytes().ct_eq(&self.master_key).unwrap_u8() != 1 {
            warn!(
                request_id = %ctx.request.id,
                path = %ctx.request.path,
                "rejected request: invalid bearer token"
            );
            ctx.short_circuit(Self::unauthorized());
        }
        Ok(())
    }
}
