//! Atomic persistence of trained artifacts.
//!
//! An artifact only appears under its final name once completely written, so
//! run resolution never observes a partial write.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Serialize `value` as pretty JSON and atomically place it at `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize artifact")?;
    buf.push('\n');
    write_atomic(path, buf.as_bytes())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read artifact {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse artifact {}", path.display()))
}

/// Write `contents` next to `path` and rename it into place.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("artifact path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("tmp");
    debug!(path = %path.display(), bytes = contents.len(), "writing artifact");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp artifact {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace artifact {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        kind: String,
        weights: Vec<f64>,
    }

    #[test]
    fn creates_parents_and_leaves_no_temp_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("models/run_1/model");
        let payload = Payload {
            kind: "test".to_string(),
            weights: vec![0.5, -1.0],
        };

        write_json_atomic(&path, &payload).expect("write");

        assert!(path.is_file());
        assert!(!path.with_extension("tmp").exists());
        let loaded: Payload = read_json(&path).expect("read");
        assert_eq!(loaded, payload);
    }

    #[test]
    fn overwrites_existing_artifact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("model");
        write_atomic(&path, b"old").expect("write");
        write_atomic(&path, b"new").expect("write");
        assert_eq!(fs::read(&path).expect("read"), b"new");
    }
}
