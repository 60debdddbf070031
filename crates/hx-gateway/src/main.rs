//! HX API Gateway — entry point.
//!
//! Reads configuration from environment variables and starts the axum-based
//! gateway service.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_PORT` | `4010` | TCP port to listen on. |
//! | `HX_MASTER_KEY` / `MASTER_KEY` | *(none)* | Shared secret for inbound bearer auth. |
//! | `HX_ALLOW_DEV_KEY` | `false` | Permit the flagged development key when no secret is set. |
//! | `HX_LITELLM_UPSTREAM` | `http://127.0.0.1:4000` | Upstream inference base URL. |
//! | `HX_UPSTREAM_KEY` | *(none)* | Credential injected into outbound requests. |
//! | `HX_TRUST_PROXY_IP` | `false` | Forward the transport peer IP as `x-hx-client-ip`. |
//! | `API_GATEWAY_CFG_DIR` | `/etc/hx-gateway` | Directory with `model_registry.yaml` and `routing.yaml`. |
//! | `HX_MAX_ROUTING_BODY_SIZE` | `65536` | Largest body the routing stage will parse. |
//! | `HX_MAX_BODY_SIZE` | `2097152` | Largest inbound body read at ingress. |

use hx_gateway::config::GatewaySettings;
use hx_gateway::pipeline::Pipeline;
use hx_gateway::server::GatewayServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("hx_gateway=info".parse().unwrap()),
        )
        .init();

    let settings = GatewaySettings::from_env();
    info!(
        port = settings.port,
        upstream = %settings.upstream_base,
        cfg_dir = %settings.cfg_dir.display(),
        trust_proxy_ip = settings.trust_proxy_ip,
        "HX API Gateway configuration loaded"
    );

    let pipeline = match Pipeline::from_settings(&settings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Gateway construction failed: {e}");
            std::process::exit(1);
        }
    };

    let server = GatewayServer::new(&settings);
    if let Err(e) = server.start(pipeline).await {
        eprintln!("Gateway error: {e}");
        std::process::exit(1);
    }
}
