//! Persistence of fitted artifacts
//!
//! Artifacts are pretty-printed JSON documents wrapped in a small envelope
//! recording what they are, so a transformer file is never read as a model.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// What an artifact file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Transformer,
    Model,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Transformer => write!(f, "transformer"),
            ArtifactKind::Model => write!(f, "model"),
        }
    }
}

/// Envelope written around every artifact payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub kind: ArtifactKind,
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

/// Write `payload` to `path`, creating parent directories as needed.
///
/// An existing file is overwritten.
pub fn save_artifact<T: Serialize>(path: &Path, kind: ArtifactKind, payload: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::io(parent, format!("Failed to create directory: {}", e))
            })?;
        }
    }

    let artifact = Artifact {
        kind,
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
        created_at: Utc::now(),
        payload,
    };

    let json = serde_json::to_string_pretty(&artifact)
        .map_err(|e| PipelineError::io(path, format!("Failed to serialize {}: {}", kind, e)))?;
    fs::write(path, json)
        .map_err(|e| PipelineError::io(path, format!("Failed to write {}: {}", kind, e)))?;

    tracing::info!(path = %path.display(), %kind, "artifact saved");
    Ok(())
}

/// Read an artifact envelope of the expected kind from `path`.
pub fn load_artifact<T: DeserializeOwned>(path: &Path, kind: ArtifactKind) -> Result<Artifact<T>> {
    let text = fs::read_to_string(path)
        .map_err(|e| PipelineError::io(path, format!("Failed to read {}: {}", kind, e)))?;

    // Check the kind first so a mixed-up path gets a clear message
    let header: ArtifactHeader = serde_json::from_str(&text)
        .map_err(|e| PipelineError::io(path, format!("Corrupt {} artifact: {}", kind, e)))?;
    if header.kind != kind {
        return Err(PipelineError::io(
            path,
            format!("Expected a {} artifact, found a {}", kind, header.kind),
        ));
    }

    let artifact: Artifact<T> = serde_json::from_str(&text)
        .map_err(|e| PipelineError::io(path, format!("Corrupt {} artifact: {}", kind, e)))?;

    tracing::debug!(
        path = %path.display(),
        %kind,
        version = %artifact.crate_version,
        created_at = %artifact.created_at,
        "artifact loaded"
    );
    Ok(artifact)
}

#[derive(Deserialize)]
struct ArtifactHeader {
    kind: ArtifactKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("a.json");

        save_artifact(&path, ArtifactKind::Model, &vec![1.0f64, 2.0]).unwrap();
        let loaded: Artifact<Vec<f64>> = load_artifact(&path, ArtifactKind::Model).unwrap();
        assert_eq!(loaded.payload, vec![1.0, 2.0]);
        assert_eq!(loaded.crate_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("t.json");

        save_artifact(&path, ArtifactKind::Transformer, &"payload").unwrap();
        let err = load_artifact::<String>(&path, ArtifactKind::Model).unwrap_err();
        assert!(err.to_string().contains("Expected a model artifact"));
    }

    #[test]
    fn test_corrupt_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();

        let err = load_artifact::<String>(&path, ArtifactKind::Model).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_artifact::<String>(Path::new("/nonexistent/m.json"), ArtifactKind::Model)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
