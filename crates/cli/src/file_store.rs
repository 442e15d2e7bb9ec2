//! JSON-file-backed key-value store (~/.config/lichen/)
//!
//! Persists license keys, license records, and version-check caches between
//! CLI invocations. The whole map is loaded once and rewritten on every
//! mutation — the data is a handful of small strings, and last-write-wins
//! is all the SDK asks of its storage.

use lichen_core::KeyValueStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const OPTIONS_FILENAME: &str = "options.json";

/// Returns `~/.config/lichen/`, creating it if needed.
pub fn config_dir() -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join("lichen");
    if !dir.exists() {
        std::fs::create_dir_all(&dir).ok()?;
    }
    Some(dir)
}

/// Default options file path under the user config directory.
pub fn default_path() -> Option<PathBuf> {
    Some(config_dir()?.join(OPTIONS_FILENAME))
}

pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`, starting empty if the file is missing or
    /// unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = Self::read(&path).unwrap_or_default();
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn read(path: &Path) -> Option<BTreeMap<String, String>> {
        let contents = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn flush(&self, values: &BTreeMap<String, String>) {
        let json = match serde_json::to_string_pretty(values) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize options");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write options");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("file store poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock().expect("file store poisoned");
        values.insert(key.to_string(), value.to_string());
        self.flush(&values);
    }

    fn delete(&self, key: &str) {
        let mut values = self.values.lock().expect("file store poisoned");
        if values.remove(key).is_some() {
            self.flush(&values);
        }
    }
}
