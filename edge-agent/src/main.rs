//! Edge Agent binary
//!
//! Wires the MQTT control plane, the NATS bus, the EdgeX client and the
//! local HTTP API around one `Agent`.

use anyhow::{Context, Result};
use edge_agent::edgex::HttpEdgexClient;
use edge_agent::registry::{spawn_liveness_monitor, ServiceRegistry};
use edge_agent::transport::{MqttControlPlane, NatsBus};
use edge_agent::{http, router, Agent, AgentConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path = AgentConfig::path_from_env();
    let config = AgentConfig::load(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Edge agent starting (config: {})", config_path.display());

    let (control_plane, eventloop) = MqttControlPlane::connect(&config.mqtt);
    let bus = NatsBus::connect(&config.nats.url)
        .await
        .context("Failed to connect to NATS")?;
    let edgex = HttpEdgexClient::new(&config.edgex.url);
    let registry = ServiceRegistry::new();

    let agent = Agent::new(
        config.clone(),
        Arc::new(control_plane.clone()),
        Arc::new(bus),
        Arc::new(edgex),
        registry.clone(),
    )
    .await
    .context("Failed to create agent")?;
    let agent = Arc::new(agent);

    spawn_liveness_monitor(registry, config.heartbeat_interval(), config.liveness_timeout());
    tokio::spawn(router::run_event_loop(eventloop, control_plane, agent.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP API on {}", addr))?;
    info!("HTTP API listening on http://{}", addr);

    axum::serve(listener, http::build_router(agent))
        .await
        .context("HTTP server failed")?;

    Ok(())
}
