pub mod backend;
pub mod elevenlabs;
pub mod local;
pub mod store;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::sync::Mutex;

use crate::error::AppError;

pub use backend::{AudioFormat, SpeechBackend, VoiceInfo, VoiceSelection};
pub use store::{VoiceReference, VoiceStore};

/// Serializes every backend call behind one owned lock: the process performs
/// at most one synthesis at a time no matter how many requests are in flight.
pub struct TtsGateway {
    backend: Mutex<Box<dyn SpeechBackend>>,
    format: AudioFormat,
    voices: VoiceStore,
    default_voice: Option<String>,
    spool_dir: Option<PathBuf>,
}

impl TtsGateway {
    pub fn new(
        backend: Box<dyn SpeechBackend>,
        voices: VoiceStore,
        default_voice: Option<String>,
        spool_dir: Option<PathBuf>,
    ) -> Self {
        let format = backend.format();
        Self {
            backend: Mutex::new(backend),
            format,
            voices,
            default_voice,
            spool_dir,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Run one synthesis call. The backend lock is held for the duration of
    /// the call and, when spooling to disk, through the file write.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
    ) -> Result<AudioArtifact, AppError> {
        if text.is_empty() {
            return Err(AppError::InvalidInput("No text provided".to_string()));
        }

        let voice = self.resolve_voice(voice_id);

        let mut backend = self.backend.lock().await;
        let bytes = backend.synthesize(text, &voice).await?;

        match &self.spool_dir {
            Some(dir) => AudioArtifact::spooled(&bytes, self.format, dir),
            None => Ok(AudioArtifact::in_memory(bytes, self.format)),
        }
    }

    pub async fn voices(&self) -> Result<Vec<VoiceInfo>, AppError> {
        let mut backend = self.backend.lock().await;
        backend.voices().await
    }

    /// Register a cloned-voice reference sample under `voice_id`. Takes the
    /// same lock as `synthesize`, so cloning and synthesis never interleave.
    pub async fn clone_voice(
        &self,
        voice_id: &str,
        name: &str,
        sample: &[u8],
        extension: &str,
    ) -> Result<VoiceReference, AppError> {
        if voice_id.is_empty() {
            return Err(AppError::InvalidInput("No voice_id provided".to_string()));
        }
        if sample.is_empty() {
            return Err(AppError::InvalidInput("No audio provided".to_string()));
        }

        let _backend = self.backend.lock().await;
        self.voices.insert(voice_id, name, sample, extension)
    }

    fn resolve_voice(&self, voice_id: Option<&str>) -> VoiceSelection {
        let resolved = voice_id
            .map(str::to_string)
            .or_else(|| self.default_voice.clone());

        let reference = resolved
            .as_deref()
            .and_then(|id| self.voices.get(id))
            .map(|r| r.sample_path);

        VoiceSelection {
            voice_id: resolved,
            reference,
        }
    }
}

/// One synthesized payload, exclusively owned by the handler that produced
/// it. A spooled artifact removes its file when the bytes are taken or when
/// the artifact drops, whichever comes first.
#[derive(Debug)]
pub struct AudioArtifact {
    format: AudioFormat,
    body: ArtifactBody,
}

#[derive(Debug)]
enum ArtifactBody {
    Memory(Vec<u8>),
    Spooled(TransientFile),
}

impl AudioArtifact {
    fn in_memory(bytes: Vec<u8>, format: AudioFormat) -> Self {
        Self {
            format,
            body: ArtifactBody::Memory(bytes),
        }
    }

    fn spooled(bytes: &[u8], format: AudioFormat, dir: &Path) -> Result<Self, AppError> {
        let file = TransientFile::write(dir, bytes, format.extension())?;
        Ok(Self {
            format,
            body: ArtifactBody::Spooled(file),
        })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Path of the spooled file, if this artifact went through disk.
    pub fn path(&self) -> Option<&Path> {
        match &self.body {
            ArtifactBody::Memory(_) => None,
            ArtifactBody::Spooled(file) => Some(file.path()),
        }
    }

    /// Consume the artifact, yielding the audio bytes. The spooled file, if
    /// any, is removed as part of this call.
    pub fn into_bytes(self) -> Result<Vec<u8>, AppError> {
        match self.body {
            ArtifactBody::Memory(bytes) => Ok(bytes),
            ArtifactBody::Spooled(file) => {
                let bytes = std::fs::read(file.path())?;
                Ok(bytes)
            }
        }
    }
}

/// RAII guard around a spooled audio file. Removal failures do not fail the
/// request; they are logged and the file is left behind.
#[derive(Debug)]
struct TransientFile {
    path: Option<TempPath>,
}

impl TransientFile {
    fn write(dir: &Path, bytes: &[u8], extension: &str) -> Result<Self, AppError> {
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("speech_")
            .suffix(&format!(".{}", extension))
            .tempfile_in(dir)?;
        file.write_all(bytes)?;

        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    fn path(&self) -> &Path {
        // Only emptied by Drop
        self.path.as_deref().unwrap()
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = path.close() {
                tracing::warn!("Could not delete transient audio file: {}", e);
            }
        }
    }
}
