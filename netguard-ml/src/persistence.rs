//! Atomic file writes and small load/save helpers.
//!
//! Every artifact a stage produces goes through [`atomic_write`]: data lands in a `.tmp`
//! sibling and is renamed into place, so a crashed stage never leaves a half-written file
//! under the final name.

use crate::error::MlError;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Atomically write raw bytes to a file, creating parent directories.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_sibling(path);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Atomically write pretty-printed JSON.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), MlError> {
    let json = serde_json::to_string_pretty(data)?;
    atomic_write(path, json.as_bytes())?;
    Ok(())
}

/// Atomically write YAML.
pub fn atomic_write_yaml<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), MlError> {
    let yaml = serde_yaml::to_string(data)?;
    atomic_write(path, yaml.as_bytes())?;
    Ok(())
}

/// Load and deserialize JSON. Missing files are an error here, not `None`:
/// stages consume paths their predecessor promised to write.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, MlError> {
    if !path.exists() {
        return Err(MlError::not_found(path.display().to_string()));
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// SHA-256 of a file's contents, hex encoded.
pub fn hash_file(path: &Path) -> Result<String, MlError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

// `with_extension` would turn `train.csv` and `train.json` into the same `train.tmp`.
fn tmp_sibling(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        name: String,
        rows: u32,
    }

    #[test]
    fn test_atomic_write_json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let data = Snapshot {
            name: "train".into(),
            rows: 800,
        };
        atomic_write_json(&path, &data).unwrap();
        let loaded: Snapshot = load_json(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs_and_no_tmp_leftover() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("report.yaml");
        atomic_write_yaml(&path, &Snapshot {
            name: "r".into(),
            rows: 1,
        })
        .unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("a").join("b").join("report.yaml.tmp").exists());
    }

    #[test]
    fn test_load_json_missing_is_not_found() {
        let err = load_json::<Snapshot>(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, MlError::NotFound(_)));
    }

    #[test]
    fn test_hash_file_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.csv");
        atomic_write(&path, b"a,b\n1,2\n").unwrap();
        let h1 = hash_file(&path).unwrap();
        let h2 = hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }
}
