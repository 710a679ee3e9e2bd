use parking_lot::Mutex;
use std::collections::BTreeMap;

use rein_core::{DecisionRecord, OperationKind, Result};

use crate::document::JsonDocument;
use crate::jsonl;
use crate::layout::StateLayout;

/// Human decisions, one file per UTC month, plus a per-type approval tally.
///
/// The tally is informational; nothing reads it back into the rules.
pub struct DecisionLog {
    layout: StateLayout,
    approvals: JsonDocument<BTreeMap<String, u64>>,
    lock: Mutex<()>,
}

impl DecisionLog {
    pub fn new(layout: StateLayout) -> Self {
        let approvals = JsonDocument::new(layout.approvals());
        Self {
            layout,
            approvals,
            lock: Mutex::new(()),
        }
    }

    pub fn record(&self, record: &DecisionRecord) -> Result<()> {
        let path = self.layout.decisions_file(record.timestamp.date_naive());
        let _guard = self.lock.lock();
        jsonl::append(&path, record)?;

        if record.approved {
            let mut tally = self.approvals.load_or_default();
            *tally
                .entry(record.operation.kind.as_str().to_string())
                .or_insert(0) += 1;
            self.approvals.save(&tally)?;
        }
        Ok(())
    }

    pub fn approvals(&self) -> BTreeMap<String, u64> {
        self.approvals.load_or_default()
    }

    pub fn approval_count(&self, kind: &OperationKind) -> u64 {
        self.approvals().get(kind.as_str()).copied().unwrap_or(0)
    }

    /// Every decision recorded in the month containing `date`.
    pub fn month(&self, date: chrono::NaiveDate) -> Result<Vec<DecisionRecord>> {
        jsonl::read_all(&self.layout.decisions_file(date))
    }
}
