//! Build state kept next to the output to skip pages that did not change.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const STATE_VERSION: &str = "1";
pub const STATE_FILENAME: &str = ".indexpages-state.json";

/// What was known about an artifact when it was last written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactState {
    pub checksum: String,
    pub sources: Vec<PathBuf>,
    /// Digest of every file the render read
    pub dependencies: BTreeMap<PathBuf, String>,
}

impl ArtifactState {
    /// Whether the artifact can be kept as is
    pub fn is_current(&self, checksum: &str, output: &Path) -> bool {
        self.checksum == checksum
            && output.exists()
            && self
                .dependencies
                .iter()
                .all(|(path, digest)| file_digest(path).as_deref() == Some(digest.as_str()))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BuildState {
    version: String,
    generated_at: String,
    /// Keyed by artifact name
    pub artifacts: BTreeMap<String, ArtifactState>,
}

impl BuildState {
    pub fn path(output_dir: &Path) -> PathBuf {
        output_dir.join(STATE_FILENAME)
    }

    /// Load the state if present and compatible, else start empty
    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = Self::path(output_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read(&path).with_context(|| format!("Failed to read build state {:?}", path))?;
        match serde_json::from_slice::<BuildState>(&data) {
            Ok(state) if state.version == STATE_VERSION => Ok(state),
            Ok(_) => Ok(Self::default()),
            Err(err) => {
                tracing::warn!("Failed to parse build state: {}", err);
                Ok(Self::default())
            }
        }
    }

    pub fn save(&mut self, output_dir: &Path) -> Result<()> {
        self.version = STATE_VERSION.to_string();
        self.generated_at = Utc::now().to_rfc3339();

        let path = Self::path(output_dir);
        let json = serde_json::to_vec_pretty(self).context("Failed to serialize build state")?;
        fs::write(&path, json).with_context(|| format!("Failed to write build state {:?}", path))?;
        Ok(())
    }
}

/// blake3 hex digest of a file, `None` if it cannot be read
pub fn file_digest(path: &Path) -> Option<String> {
    fs::read(path).ok().map(|data| blake3::hash(&data).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_state_is_empty() {
        let dir = TempDir::new().unwrap();
        let state = BuildState::load(dir.path()).unwrap();
        assert!(state.artifacts.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut state = BuildState::default();
        state.artifacts.insert(
            "/blog/2020/index.html".to_string(),
            ArtifactState {
                checksum: "abc".to_string(),
                ..Default::default()
            },
        );
        state.save(dir.path()).unwrap();

        let loaded = BuildState::load(dir.path()).unwrap();
        assert_eq!(loaded.artifacts["/blog/2020/index.html"].checksum, "abc");
    }

    #[test]
    fn test_incompatible_state_is_discarded() {
        let dir = TempDir::new().unwrap();
        fs::write(BuildState::path(dir.path()), "not json").unwrap();
        assert!(BuildState::load(dir.path()).unwrap().artifacts.is_empty());
    }

    #[test]
    fn test_is_current_tracks_dependencies() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("index.html");
        let dep = dir.path().join("post.md");
        fs::write(&output, "<html>").unwrap();
        fs::write(&dep, "one").unwrap();

        let state = ArtifactState {
            checksum: "abc".to_string(),
            sources: Vec::new(),
            dependencies: BTreeMap::from([(dep.clone(), file_digest(&dep).unwrap())]),
        };
        assert!(state.is_current("abc", &output));
        assert!(!state.is_current("def", &output));

        fs::write(&dep, "two").unwrap();
        assert!(!state.is_current("abc", &output));
    }
}
