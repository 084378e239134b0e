//! Persistent state: consent flags, remembered inputs and server values.
//!
//! A single JSON object on disk:
//!
//! ```text
//! {
//!   "$show": { "<type>": { "<id>": 0 } },   # "don't show again" per identity
//!   "user.email": "me@example.com",         # remembered field values
//!   ...                                     # values issued by the server
//! }
//! ```
//!
//! Loading is best effort. Every update re-reads the file and applies an
//! RFC 7386 merge patch, so concurrent Tattle processes converge instead
//! of overwriting each other's keys.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};

use crate::model::Identity;

/// Errors that can occur while writing the store.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, PersistError>;

/// JSON-backed key-value store.
#[derive(Debug, Clone)]
pub struct PersistentStore {
    path: Option<PathBuf>,
    data: Value,
}

impl Default for PersistentStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl PersistentStore {
    /// A store with no backing file. Patches apply to memory only.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Value::Object(Map::new()),
        }
    }

    /// Load the store at `path`.
    ///
    /// A missing or corrupt file yields an empty store that will still
    /// write to `path` on the next patch.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match read_object(&path) {
            Ok(Some(data)) => data,
            Ok(None) => Value::Object(Map::new()),
            Err(e) => {
                log::warn!("failed to read persistent data from {}: {e}", path.display());
                Value::Object(Map::new())
            }
        };
        Self {
            path: Some(path),
            data,
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The current in-memory snapshot.
    #[cfg(test)]
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// A remembered string value, if any.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Whether reports with this identity should prompt the user.
    ///
    /// Missing means show. `0`, `false`, `null` and `""` mean don't.
    pub fn should_show(&self, identity: &Identity) -> bool {
        self.data
            .pointer(&identity.show_pointer())
            .is_none_or(truthy)
    }

    /// Re-read the file, apply `patch`, and write the result back.
    ///
    /// If the file can't be re-read the last in-memory snapshot is patched
    /// instead. The in-memory snapshot always reflects the patch, even when
    /// the write fails.
    pub fn merge_patch(&mut self, patch: &Value) -> Result<()> {
        let Some(path) = &self.path else {
            merge_patch(&mut self.data, patch);
            return Ok(());
        };

        let mut data = match read_object(path) {
            Ok(Some(latest)) => latest,
            Ok(None) => self.data.clone(),
            Err(e) => {
                log::debug!("re-read of {} failed, using snapshot: {e}", path.display());
                self.data.clone()
            }
        };
        merge_patch(&mut data, patch);
        self.data = data;

        write_object(path, &self.data)
    }

    /// Record "don't show again" for `identity`.
    pub fn suppress(&mut self, identity: &Identity) -> Result<()> {
        self.merge_patch(&suppress_patch(identity))
    }
}

/// Patch that sets `$show/<type>/<id>` to 0.
pub fn suppress_patch(identity: &Identity) -> Value {
    let mut ids = Map::new();
    ids.insert(identity.id.clone(), Value::from(0));
    let mut kinds = Map::new();
    kinds.insert(identity.kind.clone(), Value::Object(ids));
    let mut root = Map::new();
    root.insert("$show".to_string(), Value::Object(kinds));
    Value::Object(root)
}

/// Apply an RFC 7386 merge patch to `target`.
///
/// Objects merge key by key, `null` deletes, anything else replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };

    for (key, value) in patch {
        if value.is_null() {
            map.remove(key);
        } else {
            merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read a JSON object from `path`. `Ok(None)` if the file doesn't exist.
fn read_object(path: &Path) -> io::Result<Option<Value>> {
    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let value: Value = serde_json::from_str(&contents).map_err(io::Error::other)?;
    if value.is_object() {
        Ok(Some(value))
    } else {
        Err(io::Error::other("persistent data is not a JSON object"))
    }
}

fn write_object(path: &Path, data: &Value) -> Result<()> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json).map_err(io_err)
}
