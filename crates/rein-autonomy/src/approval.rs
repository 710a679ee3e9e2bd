use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::info;

use rein_core::{Choice, Operation, ReinError, Result};

use crate::queue::QueueEntry;

/// Answer to a batch review prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchChoice {
    /// Run every queued operation through the auto path.
    ApproveAll,
    /// Drop every queued operation.
    RejectAll,
    /// Prompt for each entry in turn.
    ReviewIndividually,
    /// Leave the queue untouched.
    Defer,
}

impl BatchChoice {
    pub const ALL: [BatchChoice; 4] = [
        Self::ApproveAll,
        Self::RejectAll,
        Self::ReviewIndividually,
        Self::Defer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ApproveAll => "Approve all",
            Self::RejectAll => "Reject all",
            Self::ReviewIndividually => "Review individually",
            Self::Defer => "Defer",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ApproveAll => "perform every queued operation",
            Self::RejectAll => "clear the queue",
            Self::ReviewIndividually => "decide on each operation separately",
            Self::Defer => "decide later",
        }
    }
}

impl fmt::Display for BatchChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Source of human answers. The loop never reads a console directly.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Pick exactly one of `choices` for a manual-approval operation.
    async fn present_options(&self, operation: &Operation, choices: &[Choice]) -> Result<Choice>;

    /// Decide what to do with the queued operations.
    async fn present_batch(&self, entries: &[QueueEntry]) -> Result<BatchChoice>;

    /// Asked after each individually reviewed entry; `false` stops the review
    /// and leaves the rest queued.
    async fn continue_review(&self, remaining: usize) -> Result<bool>;
}

/// Answers prompts from pre-scripted queues.
///
/// Once a script runs dry the responder picks the first declining choice,
/// defers batches, and stops individual review.
#[derive(Default)]
pub struct ScriptedResponder {
    choices: Mutex<VecDeque<usize>>,
    batches: Mutex<VecDeque<BatchChoice>>,
    continues: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices into the offered choice list, consumed in order.
    pub fn with_choices(self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.choices.lock().extend(indices);
        self
    }

    pub fn with_batches(self, answers: impl IntoIterator<Item = BatchChoice>) -> Self {
        self.batches.lock().extend(answers);
        self
    }

    pub fn with_continues(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.continues.lock().extend(answers);
        self
    }

    /// Every prompt shown so far, as `options:<type>`, `batch:<len>` or
    /// `continue:<remaining>`.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn present_options(&self, operation: &Operation, choices: &[Choice]) -> Result<Choice> {
        self.prompts.lock().push(format!("options:{}", operation.kind));
        let scripted = self.choices.lock().pop_front();
        let picked = match scripted {
            Some(index) => choices.get(index),
            None => choices.iter().find(|c| !c.approved),
        };
        let choice = picked.cloned().ok_or_else(|| {
            ReinError::Prompt(format!("no usable answer among {} choices", choices.len()))
        })?;
        info!(op = %operation.kind, choice = %choice.label, "scripted decision");
        Ok(choice)
    }

    async fn present_batch(&self, entries: &[QueueEntry]) -> Result<BatchChoice> {
        self.prompts.lock().push(format!("batch:{}", entries.len()));
        Ok(self.batches.lock().pop_front().unwrap_or(BatchChoice::Defer))
    }

    async fn continue_review(&self, remaining: usize) -> Result<bool> {
        self.prompts.lock().push(format!("continue:{remaining}"));
        Ok(self.continues.lock().pop_front().unwrap_or(false))
    }
}
