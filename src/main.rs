//! Persona Room - a group chat with a cast of model-voiced personas
//!
//! One user joins a simulated chat room; every other participant is voiced
//! by a single language-model session.

mod api;
mod config;
mod history;
mod llm;
mod prompt;
mod roster;
mod segmenter;
mod session;
mod state_machine;
mod store;
mod transcript;

use api::{create_router, AppState};
use config::ServerConfig;
use llm::{CompletionService, GeminiService, LlmConfig, LoggingService};
use roster::Roster;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persona_room=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServerConfig::from_env()?;

    let roster = Arc::new(Roster::load(&config.roster)?);
    tracing::info!(
        personas = roster.personas().len(),
        source = ?config.roster,
        "Roster loaded"
    );

    let store = config.open_store()?;

    // Completion backend
    let llm_config = LlmConfig::from_env();
    let Some(gemini) = GeminiService::from_config(&llm_config) else {
        tracing::error!("No completion backend configured. Set GEMINI_API_KEY.");
        return Err("GEMINI_API_KEY is not set".into());
    };
    let gemini: Arc<dyn CompletionService> = Arc::new(gemini?);
    let completion: Arc<dyn CompletionService> = Arc::new(LoggingService::new(gemini));
    tracing::info!(model = %completion.model_id(), "Completion service initialized");

    // Create application state
    let state = AppState::new(roster, store, completion, config.session.clone());

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Persona Room server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
