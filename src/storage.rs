use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

const DOCUMENT_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode document `{key}`: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("invalid document key `{0}`")]
    InvalidKey(String),
}

/// Directory of whole JSON documents, one file per key.
///
/// Reads never fail: a missing, unreadable or corrupt document yields the
/// caller's fallback. Writes replace the full document.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        if !is_valid_key(key) {
            warn!(key, "rejecting read of invalid document key");
            return fallback;
        }

        let path = self.document_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(key, "document not found, using fallback");
                return fallback;
            }
            Err(err) => {
                warn!(key, error = %err, "document unreadable, using fallback");
                return fallback;
            }
        };

        match serde_json::from_str::<Option<T>>(&raw) {
            Ok(Some(value)) => value,
            Ok(None) => fallback,
            Err(err) => {
                warn!(key, error = %err, "document corrupt, using fallback");
                fallback
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        if !is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        fs::create_dir_all(&self.dir)?;
        let encoded = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;

        let path = self.document_path(key);
        let staging = path.with_extension(format!("{DOCUMENT_EXTENSION}.tmp"));
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(&encoded)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&staging, &path)?;
        debug!(key, bytes = encoded.len(), "document written");

        Ok(())
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{DOCUMENT_EXTENSION}"))
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;

    use super::{Store, StorageError};

    #[test]
    fn missing_key_returns_fallback() {
        let store = Store::open(temp_dir("store_missing"));
        let fallback = BTreeMap::from([("2024-01-01".to_string(), vec!["x".to_string()])]);
        let loaded = store.get("dash_events", fallback.clone());
        assert_eq!(loaded, fallback);
    }

    #[test]
    fn set_overwrites_whole_document() {
        let dir = temp_dir("store_overwrite");
        let store = Store::open(&dir);
        store
            .set("dash_todos", &vec!["a".to_string(), "b".to_string()])
            .expect("first write should succeed");
        store
            .set("dash_todos", &vec!["c".to_string()])
            .expect("second write should succeed");

        let loaded: Vec<String> = store.get("dash_todos", Vec::new());
        assert_eq!(loaded, vec!["c".to_string()]);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_or_null_document_falls_back() {
        let dir = temp_dir("store_corrupt");
        fs::create_dir_all(&dir).expect("temp dir should be created");
        fs::write(dir.join("dash_notes.json"), "{not json").expect("write should succeed");
        fs::write(dir.join("dash_ui.json"), "null").expect("write should succeed");

        let store = Store::open(&dir);
        let notes: Vec<String> = store.get("dash_notes", vec!["fallback".to_string()]);
        assert_eq!(notes, vec!["fallback".to_string()]);
        let ui: Vec<u32> = store.get("dash_ui", vec![7]);
        assert_eq!(ui, vec![7]);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rejects_path_like_keys() {
        let store = Store::open(temp_dir("store_keys"));
        let err = store
            .set("../escape", &1u32)
            .expect_err("path-like key should be rejected");
        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert_eq!(store.get("../escape", 5u32), 5);
    }

    fn temp_dir(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("deskboard_{}_{}", name, std::process::id()));
        path
    }
}
