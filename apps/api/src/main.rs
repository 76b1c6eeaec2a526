mod config;
mod errors;
mod llm_client;
mod relay;
mod report;
mod routes;
mod state;
mod wizard;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::relay::{DisabledRelay, EmailJsRelay, LeadRelay};
use crate::routes::build_router;
use crate::state::AppState;
use crate::wizard::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resilience API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the analysis model client. A missing key is reported per request.
    let llm = LlmClient::new(config.gemini_api_key.clone())?;
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY not set; analyses will fail with API_KEY_REQUIRED");
    }
    info!(
        "LLM client initialized (model: {}, prompt: {:?})",
        llm_client::MODEL,
        config.prompt_variant
    );

    // Initialize the lead relay
    let relay: Arc<dyn LeadRelay> = match config.relay.clone() {
        Some(relay_config) => {
            info!("EmailJS lead relay enabled (service: {})", relay_config.service_id);
            Arc::new(EmailJsRelay::new(relay_config)?)
        }
        None => {
            warn!("EmailJS credentials not set; leads will not be relayed");
            Arc::new(DisabledRelay)
        }
    };

    let sessions = SessionStore::new(config.session_ttl_minutes);
    info!("Session store ready (ttl: {} min)", config.session_ttl_minutes);

    // Content-Disposition must be exposed for the browser to read the report filename.
    let cors = match &config.cors_allowed_origin {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .with_context(|| format!("CORS_ALLOWED_ORIGIN '{origin}' is not a valid origin"))?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    // Build app state
    let state = AppState {
        config: config.clone(),
        model: Arc::new(llm),
        relay,
        sessions,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
