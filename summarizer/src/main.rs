use common::configuration::Configuration;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use summarizer::handlers::route;
use summarizer::state::AppState;
use summarizer::utils::tracing::init_tracer;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracer();

    let config = Configuration::load_from_env()?;
    let bind_address = config.listener.address.clone();
    let state = Arc::new(AppState::new(config)?);
    info!(
        default_model = %state.config.default_model(),
        providers = state.llm_providers.len(),
        timeout_ms = state.config.request_timeout().as_millis() as u64,
        "configuration loaded"
    );
    if state.llm_providers.is_empty() {
        warn!("no model_providers configured, using default endpoints and API keys from the environment");
    }
    let listener = TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "summarizer listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let peer_addr = stream.peer_addr()?;
        let io = TokioIo::new(stream);

        let state = Arc::clone(&state);
        let service = service_fn(move |req| {
            let state = Arc::clone(&state);
            async move { route(req, state).await }
        });

        tokio::task::spawn(async move {
            debug!(peer = %peer_addr, "accepted connection");
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(peer = %peer_addr, error = ?err, "error serving connection");
            }
        });
    }
}
