//! Whole-file JSON documents (trust scores, approval tallies, persisted queue).

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::warn;

use rein_core::{ReinError, Result};

/// A JSON document stored at a fixed path and rewritten in full on save.
#[derive(Debug, Clone)]
pub struct JsonDocument<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. `Ok(None)` when the file does not exist.
    pub fn load(&self) -> Result<Option<T>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReinError::store(&self.path, e)),
        };
        let value = serde_json::from_str(&raw).map_err(|e| ReinError::store(&self.path, e))?;
        Ok(Some(value))
    }

    /// Read the document, falling back to `T::default()` when it is missing
    /// or unreadable.
    pub fn load_or_default(&self) -> T {
        match self.load() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "state document unreadable, starting empty");
                T::default()
            }
        }
    }

    /// Write the document through a sibling temp file and rename it into place.
    pub fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ReinError::store(&self.path, e))?;
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| ReinError::store(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| ReinError::store(&self.path, e))?;
        Ok(())
    }
}
