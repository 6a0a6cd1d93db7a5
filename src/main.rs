use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use relay_core::config::RelayConfig;
use relay_engine::{Coordinator, CoordinatorSettings};
use relay_gateway::HttpToolGateway;
use relay_identity::verifier::TokenVerifier;
use relay_memory::RemoteSessionStore;
use relay_model::HttpModelClient;
use relay_telemetry::sink::{HttpTraceSink, NullSink, TraceSink};

const TRACE_EMIT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    relay_telemetry::logging::init("info");

    let config = RelayConfig::from_env().context("loading configuration")?;
    tracing::info!(
        model_id = %config.model_id,
        region = %config.region,
        max_steps = config.max_steps,
        "starting relay"
    );

    let http = reqwest::Client::new();
    let verifier = TokenVerifier::from_discovery(&http, &config.issuer_url, &config.audience)
        .await
        .context("initializing token verifier")?;

    let store = RemoteSessionStore::new(&config.memory_url, &config.memory_id);
    let gateway = HttpToolGateway::with_timeout(&config.gateway_url, config.tool_timeout);
    let model = HttpModelClient::new(&config.model_url, &config.model_id);

    let sink: Arc<dyn TraceSink> = if config.trace_url.is_empty() {
        tracing::info!("no trace collector configured; traces discarded");
        Arc::new(NullSink)
    } else {
        Arc::new(HttpTraceSink::new(&config.trace_url, TRACE_EMIT_TIMEOUT))
    };

    let coordinator = Coordinator::new(
        Arc::new(verifier),
        Arc::new(store),
        Arc::new(gateway),
        Arc::new(model),
        sink,
        CoordinatorSettings {
            gateway_url: config.gateway_url.clone(),
            memory_id: config.memory_id.clone(),
            region: config.region.clone(),
            max_steps: config.max_steps as usize,
            trace_verbosity: config.trace_verbosity,
        },
    );

    let server_config = relay_server::ServerConfig { port: config.port };
    let handle = relay_server::start(server_config, Arc::new(coordinator))
        .await
        .context("starting server")?;

    tracing::info!(port = handle.port, "relay ready");

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl+c")?;

    tracing::info!("shutting down");
    Ok(())
}
