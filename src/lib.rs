//! Serialized TTS gateway: one HTTP surface, at most one backend synthesis
//! call in flight at any instant.
//!
//! The gateway accepts text over HTTP, hands it to a single synthesis
//! backend (a local ONNX model or the ElevenLabs API) behind an owned lock,
//! and streams the audio back, cleaning up any transient file it spooled
//! through.

pub mod api;
pub mod config;
pub mod error;
pub mod tts;

pub use api::routes::{create_router, AppState};
pub use config::{BackendKind, Config, ConfigError};
pub use error::AppError;
pub use tts::TtsGateway;
