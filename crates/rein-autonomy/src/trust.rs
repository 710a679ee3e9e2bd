use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use rein_core::{Event, EventBus, OperationKind, normalize_tag};
use rein_store::{TrustDocument, TrustSample, TrustStore};

/// Default number of most recent outcomes kept per operation type.
pub const DEFAULT_WINDOW: usize = 20;

/// Rolling success history per operation type.
///
/// Each type's read-modify-write runs under that type's map entry lock.
/// Writes of the whole document are serialized; a failed write is logged and
/// the in-memory history stays authoritative.
pub struct TrustTracker {
    histories: DashMap<OperationKind, VecDeque<TrustSample>>,
    window: usize,
    auto_threshold: f64,
    store: Option<TrustStore>,
    events: Option<EventBus>,
    persist_lock: Mutex<()>,
}

/// Snapshot of one type's trust state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrustStats {
    pub kind: OperationKind,
    pub samples: usize,
    pub successes: usize,
    pub success_rate: Option<f64>,
}

impl TrustTracker {
    /// In-memory tracker with nothing persisted.
    pub fn new(window: usize, auto_threshold: f64) -> Self {
        Self {
            histories: DashMap::new(),
            window: window.max(1),
            auto_threshold,
            store: None,
            events: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Load existing history from `store` and persist every update back to it.
    pub fn with_store(mut self, store: TrustStore) -> Self {
        let document = store.load();
        for (tag, samples) in document.operation_history {
            let kind = OperationKind::parse(&normalize_tag(&tag));
            let mut history = self.histories.entry(kind).or_default();
            history.extend(samples);
            while history.len() > self.window {
                history.pop_front();
            }
        }
        debug!(path = ?store.path(), types = self.histories.len(), "loaded trust history");
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Record the outcome of a completed execution. Returns the new success rate.
    pub fn record_outcome(&self, kind: &OperationKind, success: bool) -> f64 {
        let rate = {
            let mut history = self.histories.entry(kind.clone()).or_default();
            history.push_back(TrustSample::now(success));
            while history.len() > self.window {
                history.pop_front();
            }
            rate_of(&history).unwrap_or(0.0)
        };

        debug!(op = %kind, success, rate, "recorded outcome");
        self.persist();

        if rate >= self.auto_threshold {
            info!(
                op = %kind,
                rate = %format!("{:.1}%", rate * 100.0),
                "success rate clears the auto threshold; consider promoting this type to auto"
            );
            if let Some(events) = &self.events {
                events.publish(Event::PromotionSuggested {
                    operation: kind.clone(),
                    success_rate: rate,
                });
            }
        }
        rate
    }

    /// Success rate over the retained window, `None` when there is no history.
    pub fn success_rate(&self, kind: &OperationKind) -> Option<f64> {
        self.histories.get(kind).and_then(|h| rate_of(&h))
    }

    pub fn history(&self, kind: &OperationKind) -> Vec<TrustSample> {
        self.histories
            .get(kind)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Stats for every type with history, ordered by type tag.
    pub fn stats(&self) -> Vec<TrustStats> {
        let mut stats: Vec<TrustStats> = self
            .histories
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| {
                let history = entry.value();
                TrustStats {
                    kind: entry.key().clone(),
                    samples: history.len(),
                    successes: history.iter().filter(|s| s.success).count(),
                    success_rate: rate_of(history),
                }
            })
            .collect();
        stats.sort_by(|a, b| a.kind.as_str().cmp(b.kind.as_str()));
        stats
    }

    /// Types whose current rate clears the auto threshold.
    pub fn promotable(&self) -> Vec<TrustStats> {
        self.stats()
            .into_iter()
            .filter(|s| s.success_rate.is_some_and(|r| r >= self.auto_threshold))
            .collect()
    }

    fn snapshot(&self) -> TrustDocument {
        let mut document = TrustDocument {
            last_updated: Some(Utc::now()),
            ..Default::default()
        };
        for entry in self.histories.iter() {
            document.operation_history.insert(
                entry.key().as_str().to_string(),
                entry.value().iter().copied().collect(),
            );
        }
        document
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let _guard = self.persist_lock.lock();
        let document = self.snapshot();
        if let Err(e) = store.save(&document) {
            warn!(error = %e, "failed to persist trust history; keeping in-memory state");
        }
    }
}

fn rate_of(history: &VecDeque<TrustSample>) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let successes = history.iter().filter(|s| s.success).count();
    Some(successes as f64 / history.len() as f64)
}
