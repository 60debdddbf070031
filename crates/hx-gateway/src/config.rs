//! Environment-driven runtime settings.
//!
//! All knobs come from the process environment so the gateway can be
//! deployed without a local configuration file; the routing documents
//! (model registry, routing policy) are the only file-based inputs and are
//! located via `API_GATEWAY_CFG_DIR`.

use std::path::PathBuf;
use std::time::Duration;

/// Default upstream inference endpoint (local LiteLLM deployment).
pub const DEFAULT_UPSTREAM: &str = "http://127.0.0.1:4000";

/// Default cap on bodies parsed by the routing stage.
pub const DEFAULT_MAX_ROUTING_BODY: usize = 65_536;

/// Default cap on inbound request bodies read at ingress.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Per-phase outbound timeouts for the execution stage.
///
/// Read is generous to accommodate inference latency; connect is short so
/// transport problems fail fast.  The total bound covers the write phase,
/// which `reqwest` does not expose separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamTimeouts {
    pub connect: Duration,
    pub read: Duration,
    pub total: Duration,
}

impl Default for UpstreamTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(2),
            read: Duration::from_secs(30),
            total: Duration::from_secs(45),
        }
    }
}

/// Runtime configuration for the gateway binary.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// TCP port to listen on.
    pub port: u16,
    /// Shared secret for the security stage.  `None` means unconfigured —
    /// construction fails unless `allow_dev_key` is set.
    pub master_key: Option<String>,
    /// Permit the flagged development key when no secret is configured.
    pub allow_dev_key: bool,
    /// Upstream inference base URL.
    pub upstream_base: String,
    /// Server-side credential injected into outbound requests, replacing
    /// whatever the caller sent.
    pub upstream_key: Option<String>,
    /// Trust the transport peer address enough to forward it as
    /// `x-hx-client-ip`.  Enable only behind a controlled network edge.
    pub trust_proxy_ip: bool,
    /// Directory holding `model_registry.yaml` and `routing.yaml`.
    pub cfg_dir: PathBuf,
    /// Maximum body size the routing stage will parse.
    pub max_routing_body: usize,
    /// Maximum inbound body size read at ingress.
    pub max_body_bytes: usize,
    /// Outbound call timeouts.
    pub timeouts: UpstreamTimeouts,
}

impl GatewaySettings {
    /// Read all settings from the environment, applying defaults.
    pub fn from_env() -> Self {
        let port = std::env::var("GATEWAY_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4010);

        let master_key = std::env::var("HX_MASTER_KEY")
            .or_else(|_| std::env::var("MASTER_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        let allow_dev_key = std::env::var("HX_ALLOW_DEV_KEY")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let upstream_base =
            std::env::var("HX_LITELLM_UPSTREAM").unwrap_or_else(|_| DEFAULT_UPSTREAM.to_string());

        let upstream_key = std::env::var("HX_UPSTREAM_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let trust_proxy_ip = std::env::var("HX_TRUST_PROXY_IP")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let cfg_dir = std::env::var("API_GATEWAY_CFG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/etc/hx-gateway"));

        let max_routing_body = std::env::var("HX_MAX_ROUTING_BODY_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_ROUTING_BODY);

        let max_body_bytes = std::env::var("HX_MAX_BODY_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        Self {
            port,
            master_key,
            allow_dev_key,
            upstream_base,
            upstream_key,
            trust_proxy_ip,
            cfg_dir,
            max_routing_body,
            max_body_bytes,
            timeouts: UpstreamTimeouts::default(),
        }
    }
}
