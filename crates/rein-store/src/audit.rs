use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use rein_core::{AuditEntry, DecisionMode, Result};

use crate::jsonl;
use crate::layout::StateLayout;

/// Append-only execution log, one file per UTC day.
pub struct AuditLog {
    layout: StateLayout,
    append_lock: Mutex<()>,
}

/// Aggregate view over a window of audit entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditSummary {
    pub days: u32,
    pub total: usize,
    pub auto: usize,
    pub successful: usize,
}

impl AuditSummary {
    pub fn auto_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.auto as f64 / self.total as f64)
    }

    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.successful as f64 / self.total as f64)
    }
}

impl AuditLog {
    pub fn new(layout: StateLayout) -> Self {
        Self {
            layout,
            append_lock: Mutex::new(()),
        }
    }

    pub fn append(&self, entry: &AuditEntry) -> Result<()> {
        let path = self.layout.audit_file(entry.timestamp.date_naive());
        let _guard = self.append_lock.lock();
        jsonl::append(&path, entry)
    }

    /// Entries recorded within the trailing `days` days, oldest first.
    pub fn entries_since(&self, days: u32) -> Result<Vec<AuditEntry>> {
        // Windows reaching past the representable range cover everything.
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let cutoff_date = cutoff.date_naive();

        let dir = self.layout.logs_dir();
        let listing = match std::fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(rein_core::ReinError::store(&dir, e)),
        };

        let mut files: Vec<(NaiveDate, std::path::PathBuf)> = listing
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let date = partition_date(path.file_name()?.to_str()?)?;
                Some((date, path))
            })
            .filter(|(date, _)| *date >= cutoff_date)
            .collect();
        files.sort();

        let mut entries = Vec::new();
        for (_, path) in files {
            let batch: Vec<AuditEntry> = jsonl::read_all(&path)?;
            entries.extend(batch.into_iter().filter(|e| e.timestamp >= cutoff));
        }
        debug!(days, count = entries.len(), "read audit window");
        Ok(entries)
    }

    pub fn summary(&self, days: u32) -> Result<AuditSummary> {
        let entries = self.entries_since(days)?;
        Ok(AuditSummary {
            days,
            total: entries.len(),
            auto: entries
                .iter()
                .filter(|e| e.decision_mode == DecisionMode::Auto)
                .count(),
            successful: entries.iter().filter(|e| e.success).count(),
        })
    }
}

fn partition_date(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name.strip_prefix("execution-")?.strip_suffix(".jsonl")?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}
