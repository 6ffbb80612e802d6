//! On-disk store for uploads and synthesized audio.
//!
//! Files are write-once and uniquely named. Nothing is rewritten; old files
//! are removed only by [`ArtifactStore::sweep`].

use crate::audio::Waveform;
use crate::audio::wav;
use crate::error::{Result, VoiceLoopError};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;
use uuid::Uuid;

/// One generated waveform file, playable by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    url_prefix: String,
}

impl ArtifactStore {
    /// Open the store, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| VoiceLoopError::Artifact {
            message: format!("Cannot create {}: {}", dir.display(), e),
        })?;
        Ok(Self {
            dir,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh base name shared by the chunks of one synthesis call.
    pub fn allocate(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, Uuid::new_v4())
    }

    /// File name for chunk `index` under `base`.
    ///
    /// The first chunk keeps the bare base name.
    pub fn chunk_name(base: &str, index: usize) -> String {
        if index == 0 {
            format!("{}.wav", base)
        } else {
            format!("{}_{}.wav", base, index)
        }
    }

    /// Persist one chunk's waveform.
    pub fn write_waveform(
        &self,
        base: &str,
        index: usize,
        waveform: &Waveform,
    ) -> Result<AudioArtifact> {
        let name = Self::chunk_name(base, index);
        let path = self.dir.join(&name);
        wav::write_waveform(&path, waveform)?;
        debug!(artifact = %name, "wrote audio artifact");
        Ok(AudioArtifact { name, path })
    }

    pub fn url(&self, artifact: &AudioArtifact) -> String {
        format!("{}/{}", self.url_prefix, artifact.name)
    }

    /// Map a served file name back to its path.
    ///
    /// # Errors
    /// Rejects names that could escape the store directory.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(VoiceLoopError::Artifact {
                message: format!("Invalid artifact name: {}", name),
            });
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(VoiceLoopError::Artifact {
                message: format!("No such artifact: {}", name),
            });
        }
        Ok(path)
    }

    /// Store a raw upload as `user_<uuid>.<ext>`.
    pub fn save_upload(&self, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        let extension = extension.trim_start_matches('.');
        let valid = !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric());
        let extension = if valid { extension } else { "bin" };
        let path = self.dir.join(format!("user_{}.{}", Uuid::new_v4(), extension));
        fs::write(&path, bytes).map_err(|e| VoiceLoopError::Artifact {
            message: format!("Cannot write {}: {}", path.display(), e),
        })?;
        Ok(path)
    }

    /// Delete files last modified more than `max_age` ago.
    ///
    /// Returns how many files were removed. Files that vanish or cannot be
    /// inspected mid-sweep are skipped.
    pub fn sweep(&self, max_age: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in fs::read_dir(&self.dir)? {
            let Ok(entry) = entry else { continue };
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, dir = %self.dir.display(), "swept old audio files");
        }
        Ok(removed)
    }
}
