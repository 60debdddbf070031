//! Backing-store guard stage.
//!
//! Certain path prefixes require live backing dependencies (relational
//! store, cache, vector store).  This stage consults the injected
//! [`DependencyProbe`]s for guarded paths and rejects with 503, naming the
//! unreachable dependencies, before any work is attempted.  Probe
//! implementations live outside this workspace.

use async_trait::async_trait;
use hx_gateway_core::{DependencyProbe, GatewayError, GatewayResponse, RequestContext, Stage};
use std::sync::Arc;
use tracing::warn;

/// Guards DB-backed path prefixes behind dependency health probes.
pub struct DbGuardStage {
    probes: Vec<Arc<dyn DependencyProbe>>,
    guarded_prefixes: Vec<String>,
}

impl DbGuardStage {
    pub fn new(
        probes: Vec<Arc<dyn DependencyProbe>>,
        guarded_prefixes: Vec<String>,
    ) -> Self {
        Self {
            probes,
            guarded_prefixes,
        }
    }

    fn is_guarded(&self, path: &str) -> bool {
        self.guarded_prefixes.iter().any(|p| path.starts_with(p))
    }
}

#[async_trait]
impl Stage for DbGuardStage {
    fn name(&self) -> &str {
        "db-guard"
    }

    async fn process(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        if !self.is_guarded(&ctx.request.path) {
            return Ok(());
        }

        let mut missing = Vec::new();
        for probe in &self.probes {
            if !probe.healthy().await {
                missing.push(probe.name().to_string());
            }
        }

        if !missing.is_empty() {
            warn!(
                request_id = %ctx.request.id,
                path = %ctx.request.path,
                missing = %missing.join(", "),
                "guarded path rejected: dependency unavailable"
            );
            ctx.short_circuit(GatewayResponse::error(
                503,
                &format!("Gateway dependency unavailable: {}.", missing.join(", ")),
                "dependency_error",
                "dependency_unavailable",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hx_gateway_core::{GatewayRequest, HttpMethod};

    struct FixedProbe {
        name: &'static str,
        healthy: bool,
    }

    #[async_trait]
    impl DependencyProbe for FixedProbe {
        fn name(&self) -> &str {
            self.name
        }

        async fn healthy(&self) -> bool {
            self.healthy
        }
    }

    fn ctx(path: &str) -> RequestContext {
        RequestContext::new(GatewayRequest::new("r1", path, HttpMethod::Post))
    }

    fn guard(healthy: bool) -> DbGuardStage {
        DbGuardStage::new(
            vec![
                Arc::new(FixedProbe { name: "PostgreSQL", healthy: true }),
                Arc::new(FixedProbe { name: "Redis", healthy }),
            ],
            vec!["/v1/rag".to_string()],
        )
    }

    #[tokio::test]
    async fn unguarded_path_passes_even_when_unhealthy() {
        let mut c = ctx("/v1/chat/completions");
        guard(false).process(&mut c).await.unwrap();
        assert!(c.response.is_none());
    }

    #[tokio::test]
    async fn guarded_path_returns_503_naming_the_dependency() {
        let mut c = ctx("/v1/rag/upsert");
        guard(false).process(&mut c).await.unwrap();
        let resp = c.response.unwrap();
        assert_eq!(resp.status, 503);
        let body = String::from_utf8_lossy(&resp.body).to_string();
        assert!(body.contains("Redis"));
        assert!(!body.contains("PostgreSQL"));
    }

    #[tokio::test]
    async fn guarded_path_passes_when_all_healthy() {
        let mut c = ctx("/v1/rag/upsert");
        guard(true).process(&mut c).await.unwrap();
        assert!(c.response.is_none());
    }
}
