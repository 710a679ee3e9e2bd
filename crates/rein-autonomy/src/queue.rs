use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

use rein_config::schema::BatchingConfig;
use rein_core::Operation;
use rein_store::JsonDocument;

/// Workspace facts captured when an operation is queued, shown to the
/// reviewer later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_modified: Option<DateTime<Utc>>,
    pub has_tests: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_count: Option<usize>,
}

impl QueueContext {
    /// Collect target-file metadata and test-suite presence relative to `root`.
    pub fn gather(operation: &Operation, root: &Path, tests_dir: &Path) -> Self {
        let mut context = Self::default();

        if let Some(target) = &operation.target_path {
            let path = root.join(target);
            match std::fs::metadata(&path) {
                Ok(meta) => {
                    context.file_exists = Some(true);
                    context.file_size = Some(meta.len());
                    context.file_modified = meta.modified().ok().map(DateTime::<Utc>::from);
                }
                Err(_) => context.file_exists = Some(false),
            }
        }

        let tests = root.join(tests_dir);
        if tests.is_dir() {
            context.has_tests = true;
            context.test_count = Some(count_test_files(&tests));
        }
        context
    }
}

fn count_test_files(dir: &Path) -> usize {
    let Ok(listing) = std::fs::read_dir(dir) else {
        return 0;
    };
    listing
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_test_files(&path)
            } else {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                usize::from(name.starts_with("test_") || name.contains("_test."))
            }
        })
        .sum()
}

/// An operation waiting for a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub operation: Operation,
    pub context: QueueContext,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(operation: Operation, context: QueueContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            context,
            enqueued_at: Utc::now(),
        }
    }
}

/// Why a batch review is due.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerReason {
    QueueFull { len: usize, max: usize },
    PriorityKeyword { keyword: String, entry: Uuid },
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull { len, max } => write!(f, "queue holds {len} of {max} operations"),
            Self::PriorityKeyword { keyword, .. } => {
                write!(f, "priority keyword '{keyword}' in a queued operation")
            }
        }
    }
}

/// FIFO buffer of operations classified `review`.
///
/// Volatile unless a persistence document is attached, in which case every
/// change is written through.
pub struct DecisionQueue {
    entries: Mutex<Vec<QueueEntry>>,
    max_queue_size: usize,
    priority_keywords: Vec<String>,
    persistence: Option<JsonDocument<Vec<QueueEntry>>>,
}

impl DecisionQueue {
    pub fn new(batching: &BatchingConfig) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_queue_size: batching.max_queue_size,
            priority_keywords: batching
                .priority_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            persistence: None,
        }
    }

    /// Restore entries from `document` and write every later change back to it.
    pub fn with_persistence(mut self, document: JsonDocument<Vec<QueueEntry>>) -> Self {
        let restored = document.load_or_default();
        if !restored.is_empty() {
            info!(count = restored.len(), "restored pending decisions");
        }
        *self.entries.get_mut() = restored;
        self.persistence = Some(document);
        self
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// Append an entry. Returns the new queue length.
    pub fn enqueue(&self, entry: QueueEntry) -> usize {
        let mut entries = self.entries.lock();
        debug!(op = %entry.operation.kind, id = %entry.id, "queued for review");
        entries.push(entry);
        self.persist(&entries);
        entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.entries.lock().clone()
    }

    pub fn should_trigger(&self) -> bool {
        self.trigger_reason().is_some()
    }

    /// Size check first, then priority keywords in each entry's description
    /// and type tag. Payloads are never inspected.
    pub fn trigger_reason(&self) -> Option<TriggerReason> {
        let entries = self.entries.lock();
        if entries.len() >= self.max_queue_size {
            return Some(TriggerReason::QueueFull {
                len: entries.len(),
                max: self.max_queue_size,
            });
        }
        entries.iter().find_map(|entry| {
            let text = entry.operation.trigger_text();
            self.priority_keywords
                .iter()
                .find(|k| text.contains(k.as_str()))
                .map(|k| TriggerReason::PriorityKeyword {
                    keyword: k.clone(),
                    entry: entry.id,
                })
        })
    }

    /// Remove and return every entry.
    pub fn drain(&self) -> Vec<QueueEntry> {
        let mut entries = self.entries.lock();
        let drained = std::mem::take(&mut *entries);
        self.persist(&entries);
        drained
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        self.drain().len()
    }

    pub fn remove(&self, id: Uuid) -> Option<QueueEntry> {
        let mut entries = self.entries.lock();
        let index = entries.iter().position(|e| e.id == id)?;
        let entry = entries.remove(index);
        self.persist(&entries);
        Some(entry)
    }

    fn persist(&self, entries: &[QueueEntry]) {
        if let Some(document) = &self.persistence {
            if let Err(e) = document.save(&entries.to_vec()) {
                warn!(error = %e, "failed to persist decision queue");
            }
        }
    }
}
