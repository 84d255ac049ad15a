use crate::errors::{CliError, CliResult};
use docmerge_core::{DiffError, DiffResult, DocumentStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read and parse a whole JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Pretty-print `value` to `path`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => fs::write(path, text + "\n").map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        }),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

/// The remote document, kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentStore for FileStore {
    fn load(&self) -> DiffResult<Value> {
        read_json(&self.path).map_err(|e| DiffError::Store(e.to_string()))
    }

    fn save(&self, document: &Value) -> DiffResult<()> {
        tracing::debug!(path = %self.path.display(), "Writing merged document");
        write_json(Some(&self.path), document).map_err(|e| DiffError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("docmerge_test_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = temp_file("store.json");
        let store = FileStore::new(&path);
        store.save(&json!({"tasks": [{"id": "1"}]})).unwrap();
        assert_eq!(store.load().unwrap(), json!({"tasks": [{"id": "1"}]}));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_store_error() {
        let store = FileStore::new(temp_file("does_not_exist.json"));
        assert!(matches!(store.load(), Err(DiffError::Store(_))));
    }

    #[test]
    fn test_invalid_json_names_file() {
        let path = temp_file("broken.json");
        fs::write(&path, "{not json").unwrap();
        let err = read_json::<Value>(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"), "{}", err);
        fs::remove_file(&path).unwrap();
    }
}
