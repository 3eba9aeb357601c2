use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::AppError;

/// A cloned voice: the uploaded reference sample on disk plus a display name.
#[derive(Debug, Clone)]
pub struct VoiceReference {
    pub name: String,
    pub sample_path: PathBuf,
}

/// Process-lifetime mapping of cloned voice ids to their reference samples.
/// Sample bytes live on disk under `refs_dir`; the map itself is in-memory
/// and starts empty on every restart.
pub struct VoiceStore {
    refs_dir: PathBuf,
    entries: RwLock<HashMap<String, VoiceReference>>,
}

impl VoiceStore {
    pub fn new(refs_dir: PathBuf) -> Self {
        Self {
            refs_dir,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Write `sample` under the refs directory and record the mapping.
    /// Re-registering an existing id overwrites both file and entry.
    pub fn insert(
        &self,
        voice_id: &str,
        name: &str,
        sample: &[u8],
        extension: &str,
    ) -> Result<VoiceReference, AppError> {
        std::fs::create_dir_all(&self.refs_dir)?;

        let sample_path = self
            .refs_dir
            .join(format!("{}.{}", sanitize_id(voice_id), extension));
        std::fs::write(&sample_path, sample)?;

        let reference = VoiceReference {
            name: name.to_string(),
            sample_path,
        };

        let mut entries = self.entries.write().unwrap();
        entries.insert(voice_id.to_string(), reference.clone());

        Ok(reference)
    }

    pub fn get(&self, voice_id: &str) -> Option<VoiceReference> {
        self.entries.read().unwrap().get(voice_id).cloned()
    }
}

/// Voice ids become file names; anything outside [A-Za-z0-9_-] is replaced.
fn sanitize_id(voice_id: &str) -> String {
    voice_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("v1"), "v1");
        assert_eq!(sanitize_id("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_id("my voice"), "my_voice");
    }

    #[test]
    fn test_insert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceStore::new(dir.path().to_path_buf());

        assert!(store.get("v1").is_none());

        let reference = store.insert("v1", "Custom", b"RIFF1234", "wav").unwrap();
        assert_eq!(reference.name, "Custom");
        assert!(reference.sample_path.exists());
        assert_eq!(std::fs::read(&reference.sample_path).unwrap(), b"RIFF1234");

        let fetched = store.get("v1").unwrap();
        assert_eq!(fetched.sample_path, reference.sample_path);
    }

    #[test]
    fn test_reinsert_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = VoiceStore::new(dir.path().to_path_buf());

        store.insert("v1", "First", b"aaaa", "wav").unwrap();
        let second = store.insert("v1", "Second", b"bbbb", "wav").unwrap();

        assert_eq!(store.get("v1").unwrap().name, "Second");
        assert_eq!(std::fs::read(&second.sample_path).unwrap(), b"bbbb");
    }
}
