use std::path::PathBuf;

/// Which synthesis backend the process runs. Selected once at startup; the
/// two are never active simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    ElevenLabs,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Self::Local),
            "elevenlabs" => Some(Self::ElevenLabs),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("PORT must be a number, got '{0}'")]
    InvalidPort(String),

    #[error("Unknown TTS_BACKEND '{0}' (expected 'local' or 'elevenlabs')")]
    UnknownBackend(String),

    #[error("ELEVENLABS_API_KEY must be set for the elevenlabs backend")]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    /// Directory holding `model.onnx` + `config.json` (local backend only).
    pub model_dir: PathBuf,
    /// Required when `backend` is `ElevenLabs`.
    pub api_key: Option<String>,
    /// Voice substituted when a request carries no `voice_id`.
    pub default_voice: Option<String>,
    /// When set, synthesized audio is spooled through a transient file in
    /// this directory instead of being buffered in memory.
    pub spool_dir: Option<PathBuf>,
    /// Where cloned-voice reference samples are written.
    pub refs_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_raw = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port_raw
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port_raw.clone()))?;

        let backend_raw = std::env::var("TTS_BACKEND").unwrap_or_else(|_| "local".to_string());
        let backend = BackendKind::parse(&backend_raw)
            .ok_or_else(|| ConfigError::UnknownBackend(backend_raw.clone()))?;

        let api_key = std::env::var("ELEVENLABS_API_KEY").ok();
        if backend == BackendKind::ElevenLabs && api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Self {
            host,
            port,
            backend,
            model_dir: std::env::var("TTS_MODEL_DIR")
                .unwrap_or_else(|_| "./model".to_string())
                .into(),
            api_key,
            default_voice: std::env::var("TTS_DEFAULT_VOICE").ok(),
            spool_dir: std::env::var("TTS_SPOOL_DIR").ok().map(PathBuf::from),
            refs_dir: std::env::var("TTS_REFS_DIR")
                .unwrap_or_else(|_| "./voice_refs".to_string())
                .into(),
        })
    }
}
