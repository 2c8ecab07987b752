//! JSON file store
//!
//! All keys live in one JSON object on disk. Every write replaces the file
//! through a temp file and rename, so a crash never leaves half a snapshot.
//!
//! Writes are blocking file I/O on the calling thread, fsync included. They
//! stay synchronous so a commit cannot be split by cancelling the task that
//! issued it; callers on a runtime pay one small-file write per commit.

use super::LocalStore;
use crate::error::{Result, SyncError};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&content)? {
                    Value::Object(map) => map,
                    other => {
                        return Err(SyncError::Storage(format!(
                            "{} does not hold a JSON object (found {})",
                            path.display(),
                            type_name(&other)
                        )))
                    }
                }
            }
        } else {
            Map::new()
        };

        debug!("Opened local store at {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &Map<String, Value>) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(entries)?;

        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&content)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.set_many(vec![(key.to_string(), value)])
    }

    fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut current = self.entries.lock();
        let mut next = current.clone();
        next.extend(entries);

        // Memory only changes once the file is safely replaced
        self.persist(&next)?;
        *current = next;
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
