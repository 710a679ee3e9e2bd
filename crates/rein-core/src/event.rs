use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::{DecisionMode, OperationKind};

/// Events emitted by the decision loop. Consumers (the CLI watch mode, tests)
/// subscribe through the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    // ── Execution lifecycle ────────────────────────────────────
    OperationExecuted {
        operation: OperationKind,
        mode: DecisionMode,
        success: bool,
    },
    OperationNotified {
        operation: OperationKind,
        description: String,
        success: bool,
    },
    OperationQueued {
        operation: OperationKind,
        queue_size: usize,
    },
    OperationRejected {
        operation: OperationKind,
        reason: Option<String>,
    },

    // ── Checkpoints ────────────────────────────────────────────
    CheckpointCreated {
        label: String,
    },
    RolledBack {
        label: String,
        restored: bool,
    },

    // ── Human-in-the-loop ──────────────────────────────────────
    BatchTriggered {
        queue_size: usize,
        reason: String,
    },
    BatchResolved {
        choice: String,
        count: usize,
    },
    DecisionRecorded {
        operation: OperationKind,
        approved: bool,
    },

    // ── Trust ──────────────────────────────────────────────────
    PromotionSuggested {
        operation: OperationKind,
        success_rate: f64,
    },

    // ── Observer ───────────────────────────────────────────────
    ChangeDetected {
        path: String,
    },
    QueuePending {
        queue_size: usize,
        timestamp: DateTime<Utc>,
    },
    Shutdown,
}

/// A broadcast-based event bus for loop-wide pub/sub.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<Event>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: Event) {
        // Ignore send errors (no subscribers).
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
