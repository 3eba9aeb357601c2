use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tts_gateway::config::{BackendKind, Config};
use tts_gateway::tts::elevenlabs::ElevenLabsBackend;
use tts_gateway::tts::local::VitsEngine;
use tts_gateway::tts::{SpeechBackend, VoiceStore};
use tts_gateway::{create_router, AppState, TtsGateway};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid address");

    tracing::info!("TTS Gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);

    let backend: Box<dyn SpeechBackend> = match config.backend {
        BackendKind::Local => {
            tracing::info!("Loading local model from {}", config.model_dir.display());
            match VitsEngine::load(&config.model_dir) {
                Ok(engine) => Box::new(engine),
                Err(e) => {
                    tracing::error!("Failed to load model: {}", e);
                    std::process::exit(1);
                }
            }
        }
        BackendKind::ElevenLabs => {
            // Key presence is validated by Config::from_env
            let api_key = config.api_key.clone().unwrap_or_default();
            match ElevenLabsBackend::new(&api_key) {
                Ok(backend) => Box::new(backend),
                Err(e) => {
                    tracing::error!("Failed to create ElevenLabs client: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let gateway = TtsGateway::new(
        backend,
        VoiceStore::new(config.refs_dir.clone()),
        config.default_voice.clone(),
        config.spool_dir.clone(),
    );

    // Create app state
    let state = Arc::new(AppState { gateway });

    // Create router
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
