use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::document::JsonDocument;

/// One recorded outcome of a completed execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustSample {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

impl TrustSample {
    pub fn now(success: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            success,
        }
    }
}

/// On-disk shape of `trust/scores.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustDocument {
    #[serde(default)]
    pub operation_history: BTreeMap<String, Vec<TrustSample>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Serializes whole-document writes of the trust history.
pub struct TrustStore {
    doc: JsonDocument<TrustDocument>,
    write_lock: Mutex<()>,
}

impl TrustStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.doc.path()
    }

    pub fn load(&self) -> TrustDocument {
        self.doc.load_or_default()
    }

    pub fn save(&self, document: &TrustDocument) -> rein_core::Result<()> {
        let _guard = self.write_lock.lock();
        self.doc.save(document)
    }
}
