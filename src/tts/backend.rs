use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

/// Container format of the bytes a backend produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VoiceInfo {
    pub voice_id: String,
    pub name: String,
}

/// Voice resolved for a single synthesis call: the voice id (explicit,
/// configured default, or none for the backend's own default) plus the cloned
/// reference sample registered under that id, when one exists.
#[derive(Debug, Clone)]
pub struct VoiceSelection {
    pub voice_id: Option<String>,
    pub reference: Option<PathBuf>,
}

/// The synthesis provider behind the gateway. Implementations are assumed
/// non-reentrant: the gateway owns the only handle and takes `&mut self`
/// through its lock, so no two calls ever run concurrently.
#[async_trait]
pub trait SpeechBackend: Send {
    fn format(&self) -> AudioFormat;

    /// Perform one synthesis call, returning encoded audio bytes.
    async fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceSelection,
    ) -> Result<Vec<u8>, AppError>;

    /// Voice identifiers the backend reports, verbatim.
    async fn voices(&mut self) -> Result<Vec<VoiceInfo>, AppError>;
}
