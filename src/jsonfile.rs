//! Helpers for the JSON files backing the user store and post index.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Reads a file holding a single JSON object.
///
/// A missing file is an empty object. Anything that is not a JSON object
/// yields `MalformedPersistedState`; callers recover from it.
pub fn read_object(path: &Path) -> Result<Map<String, Value>, StoreError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e.into()),
    };
    let malformed = |reason: String| StoreError::MalformedPersistedState {
        path: path.display().to_string(),
        reason,
    };
    match serde_json::from_slice::<Value>(&raw).map_err(|e| malformed(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(malformed(format!("expected an object, found {}", kind(&other)))),
    }
}

/// Writes `value` as pretty JSON next to `path` and renames it into place.
pub fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
