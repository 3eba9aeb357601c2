use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::Deserialize;

use crate::error::AppError;
use crate::tts::backend::{AudioFormat, SpeechBackend, VoiceInfo, VoiceSelection};

/// Describes the model directory: `model.onnx` next to a `config.json` with
/// the sample rate, the character vocabulary and any named speakers.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    pub vocab: HashMap<String, i64>,
    #[serde(default)]
    pub speakers: Vec<SpeakerConfig>,
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// One named speaker of a multi-speaker graph.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeakerConfig {
    pub id: String,
    pub name: String,
    pub sid: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,
    #[serde(default = "default_length_scale")]
    pub length_scale: f32,
    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

/// VITS-style local synthesis engine running on ONNX Runtime.
pub struct VitsEngine {
    session: Session,
    config: ModelConfig,
}

impl VitsEngine {
    /// Load the model eagerly. Called once at startup; a failure here is
    /// fatal to the process.
    pub fn load(model_dir: &Path) -> Result<Self, AppError> {
        let config_path = model_dir.join("config.json");
        let config_file = std::fs::File::open(&config_path).map_err(|e| {
            AppError::Backend(format!("Failed to open {}: {}", config_path.display(), e))
        })?;
        let config: ModelConfig = serde_json::from_reader(config_file)
            .map_err(|e| AppError::Backend(format!("Invalid model config: {}", e)))?;

        let session = Session::builder()
            .map_err(|e| AppError::Backend(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::Backend(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| AppError::Backend(format!("Failed to set threads: {}", e)))?
            .commit_from_file(model_dir.join("model.onnx"))
            .map_err(|e| AppError::Backend(format!("Failed to load model: {}", e)))?;

        Ok(Self { session, config })
    }

    fn run_inference(&mut self, ids: &[i64], sid: Option<i64>) -> Result<Vec<f32>, AppError> {
        let input_len = ids.len();

        // input: [batch, sequence] = [1, char_count]
        let input_value = Value::from_array((vec![1, input_len], ids.to_vec()))
            .map_err(|e| AppError::Backend(format!("Failed to create input tensor: {}", e)))?;

        // input_lengths: [batch] = [1]
        let lengths_value = Value::from_array((vec![1], vec![input_len as i64]))
            .map_err(|e| AppError::Backend(format!("Failed to create lengths tensor: {}", e)))?;

        // scales: [3] = [noise_scale, length_scale, noise_w]
        let inference = &self.config.inference;
        let scales_value = Value::from_array((
            vec![3],
            vec![
                inference.noise_scale,
                inference.length_scale,
                inference.noise_w,
            ],
        ))
        .map_err(|e| AppError::Backend(format!("Failed to create scales tensor: {}", e)))?;

        let outputs = match sid {
            Some(sid) => {
                // sid: [1], only fed to multi-speaker graphs
                let sid_value = Value::from_array((vec![1], vec![sid])).map_err(|e| {
                    AppError::Backend(format!("Failed to create speaker tensor: {}", e))
                })?;
                self.session
                    .run(ort::inputs![input_value, lengths_value, scales_value, sid_value])
            }
            None => self
                .session
                .run(ort::inputs![input_value, lengths_value, scales_value]),
        }
        .map_err(|e| AppError::Backend(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get("output")
            .or_else(|| outputs.get("audio"))
            .ok_or_else(|| AppError::Backend("Missing output tensor".to_string()))?;

        let output_view = output
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::Backend(format!("Failed to extract output tensor: {}", e)))?;

        Ok(output_view.1.iter().copied().collect())
    }
}

#[async_trait]
impl SpeechBackend for VitsEngine {
    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    async fn synthesize(
        &mut self,
        text: &str,
        voice: &VoiceSelection,
    ) -> Result<Vec<u8>, AppError> {
        let sid = select_speaker(&self.config.speakers, voice)?;

        let ids = tokenize(&self.config.vocab, text);
        if ids.is_empty() {
            return Err(AppError::Backend(
                "Text contains no synthesizable characters".to_string(),
            ));
        }

        let samples = self.run_inference(&ids, sid)?;
        samples_to_wav(&samples, self.config.sample_rate)
    }

    async fn voices(&mut self) -> Result<Vec<VoiceInfo>, AppError> {
        if self.config.speakers.is_empty() {
            return Ok(vec![VoiceInfo {
                voice_id: "default".to_string(),
                name: "Default".to_string(),
            }]);
        }

        Ok(self
            .config
            .speakers
            .iter()
            .map(|s| VoiceInfo {
                voice_id: s.id.clone(),
                name: s.name.clone(),
            })
            .collect())
    }
}

/// Map the resolved voice onto a speaker id for the graph, if it has one.
/// The graph takes no reference-audio input, so a cloned sample cannot
/// condition it; the request still succeeds with the default speaker.
pub fn select_speaker(
    speakers: &[SpeakerConfig],
    voice: &VoiceSelection,
) -> Result<Option<i64>, AppError> {
    if voice.reference.is_some() {
        tracing::warn!(
            "Voice reference samples are not supported by this model; using default speaker"
        );
        return Ok(speakers.first().map(|s| s.sid));
    }

    match voice.voice_id.as_deref() {
        None => Ok(speakers.first().map(|s| s.sid)),
        Some(id) => match speakers.iter().find(|s| s.id == id) {
            Some(speaker) => Ok(Some(speaker.sid)),
            None if speakers.is_empty() => Ok(None),
            None => Err(AppError::Backend(format!("Unknown voice: {}", id))),
        },
    }
}

/// Convert text to character ids using the model vocabulary. Characters the
/// vocabulary does not cover are skipped.
pub fn tokenize(vocab: &HashMap<String, i64>, text: &str) -> Vec<i64> {
    let mut ids = Vec::new();

    for ch in text.to_lowercase().chars() {
        let key = ch.to_string();
        if let Some(&id) = vocab.get(&key) {
            ids.push(id);
        }
    }

    ids
}

/// Encode audio samples as 16-bit mono WAV.
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AppError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, spec)
            .map_err(|e| AppError::Backend(format!("Failed to create WAV writer: {}", e)))?;

        for sample in samples {
            let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(scaled)
                .map_err(|e| AppError::Backend(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| AppError::Backend(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vocab() -> HashMap<String, i64> {
        [("h", 1), ("e", 2), ("l", 3), ("o", 4), (" ", 5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_tokenize_maps_known_chars() {
        let ids = tokenize(&test_vocab(), "hello");
        assert_eq!(ids, vec![1, 2, 3, 3, 4]);
    }

    #[test]
    fn test_tokenize_lowercases_and_skips_unknown() {
        let ids = tokenize(&test_vocab(), "HELLO, world!");
        // Punctuation and uncovered letters drop out
        assert_eq!(ids, vec![1, 2, 3, 3, 4, 5, 4, 3]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize(&test_vocab(), "").is_empty());
        assert!(tokenize(&test_vocab(), "???").is_empty());
    }

    #[test]
    fn test_select_speaker_by_id() {
        let speakers = vec![
            SpeakerConfig {
                id: "alice".to_string(),
                name: "Alice".to_string(),
                sid: 0,
            },
            SpeakerConfig {
                id: "bob".to_string(),
                name: "Bob".to_string(),
                sid: 7,
            },
        ];
        let voice = VoiceSelection {
            voice_id: Some("bob".to_string()),
            reference: None,
        };
        assert_eq!(select_speaker(&speakers, &voice).unwrap(), Some(7));
    }

    #[test]
    fn test_select_speaker_defaults_to_first() {
        let speakers = vec![SpeakerConfig {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            sid: 3,
        }];
        let voice = VoiceSelection {
            voice_id: None,
            reference: None,
        };
        assert_eq!(select_speaker(&speakers, &voice).unwrap(), Some(3));
    }

    #[test]
    fn test_select_speaker_unknown_id_fails() {
        let speakers = vec![SpeakerConfig {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            sid: 0,
        }];
        let voice = VoiceSelection {
            voice_id: Some("nobody".to_string()),
            reference: None,
        };
        assert!(select_speaker(&speakers, &voice).is_err());
    }

    #[test]
    fn test_select_speaker_single_speaker_graph() {
        let voice = VoiceSelection {
            voice_id: Some("anything".to_string()),
            reference: None,
        };
        assert_eq!(select_speaker(&[], &voice).unwrap(), None);
    }

    #[test]
    fn test_samples_to_wav_empty() {
        let wav = samples_to_wav(&[], 16000).unwrap();
        // Valid WAV header even for empty audio
        assert!(wav.starts_with(b"RIFF"));
    }

    #[test]
    fn test_samples_to_wav_valid() {
        let samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        let wav = samples_to_wav(&samples, 16000).unwrap();
        assert!(wav.starts_with(b"RIFF"));
        assert!(wav.len() > 44); // Header + some data
    }

    #[test]
    fn test_model_config_parses_with_defaults() {
        let raw = r#"{"vocab": {"a": 1}}"#;
        let config: ModelConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.sample_rate, 16000);
        assert!(config.speakers.is_empty());
        assert_eq!(config.inference.length_scale, 1.0);
    }
}
