//! The execution pipeline.
//!
//! ```text
//!   operation ──► classify ──┬─ auto ────► checkpoint ► perform ► verify ► trust ► rollback? ► audit
//!                            ├─ notify ──► (same as auto) ► notification
//!                            ├─ review ──► queue ──► trigger? ──► batch prompt
//!                            └─ manual ──► single-choice prompt ──► approved? ──► auto path
//! ```

use serde::Serialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use rein_autonomy::{
    AutonomyClassifier, BatchChoice, Classification, DecisionQueue, QueueContext, QueueEntry,
    Responder, ScriptedResponder, TrustTracker,
};
use rein_config::ReinConfig;
use rein_core::{
    AuditEntry, DecisionMode, DecisionRecord, Event, EventBus, ExecutionResult, ExecutionStatus,
    Operation,
};
use rein_store::{AuditLog, DecisionLog, JsonDocument, StateLayout, TrustStore};

use crate::checkpoint::{CheckpointManager, GitStash, SnapshotStore};
use crate::perform::{Performer, WorkspacePerformer};
use crate::verify::{CommandVerifier, VerificationReport, VerificationRunner};

/// What a batch prompt resolved to.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub choice: BatchChoice,
    /// One result per entry that was executed or explicitly decided.
    pub results: Vec<ExecutionResult>,
    /// Entries dropped without a decision (reject-all).
    pub dropped: usize,
    /// Entries still queued afterwards.
    pub remaining: usize,
}

/// The decision loop's context object. Owns the read-only rules, the trust
/// tracker, the review queue, the state stores and every collaborator.
pub struct Engine {
    config: Arc<ReinConfig>,
    root: PathBuf,
    layout: Option<StateLayout>,
    classifier: AutonomyClassifier,
    trust: TrustTracker,
    queue: DecisionQueue,
    checkpoints: Option<CheckpointManager>,
    performer: Arc<dyn Performer>,
    verifier: Option<Arc<dyn VerificationRunner>>,
    responder: Arc<dyn Responder>,
    audit: Option<AuditLog>,
    decisions: Option<DecisionLog>,
    events: EventBus,
}

impl Engine {
    pub fn builder(config: Arc<ReinConfig>, root: impl Into<PathBuf>) -> EngineBuilder {
        EngineBuilder::new(config, root.into())
    }

    pub fn config(&self) -> &ReinConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> Option<&StateLayout> {
        self.layout.as_ref()
    }

    pub fn trust(&self) -> &TrustTracker {
        &self.trust
    }

    pub fn queue(&self) -> &DecisionQueue {
        &self.queue
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn classifier(&self) -> &AutonomyClassifier {
        &self.classifier
    }

    pub fn checkpoints(&self) -> Option<&CheckpointManager> {
        self.checkpoints.as_ref()
    }

    pub fn audit(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    pub fn decisions(&self) -> Option<&DecisionLog> {
        self.decisions.as_ref()
    }

    pub fn classify(&self, operation: &Operation) -> Classification {
        self.classifier.explain(operation, &self.trust)
    }

    /// Run one operation to completion. Never returns an error: every failure
    /// is reported through `status` and `reason`.
    pub async fn execute(&self, operation: Operation) -> ExecutionResult {
        let classification = self.classify(&operation);
        info!(
            op = %operation.kind,
            mode = %classification.mode,
            reason = %classification.reason(),
            "executing operation"
        );

        match classification.mode {
            DecisionMode::Auto => self.run_auto(&operation, DecisionMode::Auto).await,
            DecisionMode::Notify => {
                let result = self.run_auto(&operation, DecisionMode::Notify).await;
                self.notify(&operation, &result);
                result
            }
            DecisionMode::Review => self.enqueue_for_review(operation).await,
            DecisionMode::Manual => self.require_approval(&operation).await,
        }
    }

    /// Queue an operation without evaluating the batch trigger. Returns the new
    /// queue length.
    pub fn enqueue(&self, operation: Operation) -> usize {
        let context = QueueContext::gather(
            &operation,
            &self.root,
            &self.config.verification.tests_dir,
        );
        let kind = operation.kind.clone();
        let queue_size = self.queue.enqueue(QueueEntry::new(operation, context));
        self.events.publish(Event::OperationQueued {
            operation: kind,
            queue_size,
        });
        queue_size
    }

    async fn enqueue_for_review(&self, operation: Operation) -> ExecutionResult {
        let kind = operation.kind.clone();
        let queue_size = self.enqueue(operation);
        info!(op = %kind, queue_size, "queued for review");

        if let Some(reason) = self.queue.trigger_reason() {
            info!(%reason, "batch review triggered");
            self.events.publish(Event::BatchTriggered {
                queue_size,
                reason: reason.to_string(),
            });
            self.present_batch().await;
        }
        ExecutionResult::queued(self.queue.len())
    }

    /// Put the queued operations in front of the responder and act on its answer.
    pub async fn present_batch(&self) -> BatchOutcome {
        let entries = self.queue.snapshot();
        if entries.is_empty() {
            return BatchOutcome {
                choice: BatchChoice::Defer,
                results: Vec::new(),
                dropped: 0,
                remaining: 0,
            };
        }

        let choice = match self.responder.present_batch(&entries).await {
            Ok(choice) => choice,
            Err(e) => {
                warn!(error = %e, "batch prompt failed, deferring");
                BatchChoice::Defer
            }
        };

        let mut results = Vec::new();
        let mut dropped = 0;
        match choice {
            BatchChoice::ApproveAll => {
                // Approved work takes the automatic path and is audited as such.
                for entry in self.queue.drain() {
                    results.push(self.run_auto(&entry.operation, DecisionMode::Auto).await);
                }
            }
            BatchChoice::RejectAll => {
                dropped = self.queue.clear();
                info!(count = dropped, "rejected queued operations");
            }
            BatchChoice::ReviewIndividually => {
                for entry in entries {
                    let Some(entry) = self.queue.remove(entry.id) else {
                        continue;
                    };
                    results.push(self.require_approval(&entry.operation).await);

                    let remaining = self.queue.len();
                    if remaining == 0 {
                        break;
                    }
                    match self.responder.continue_review(remaining).await {
                        Ok(true) => {}
                        Ok(false) => {
                            info!(remaining, "review stopped, remaining operations stay queued");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "continue prompt failed, stopping review");
                            break;
                        }
                    }
                }
            }
            BatchChoice::Defer => debug!("batch deferred"),
        }

        let remaining = self.queue.len();
        self.events.publish(Event::BatchResolved {
            choice: choice.label().to_string(),
            count: results.len() + dropped,
        });
        BatchOutcome {
            choice,
            results,
            dropped,
            remaining,
        }
    }

    async fn require_approval(&self, operation: &Operation) -> ExecutionResult {
        let profile = self.classifier.registry().profile(&operation.kind);
        info!(op = %operation.kind, "manual approval required");

        let choice = match self
            .responder
            .present_options(operation, &profile.choices)
            .await
        {
            Ok(choice) => choice,
            Err(e) => {
                warn!(op = %operation.kind, error = %e, "no decision obtained, rejecting");
                self.events.publish(Event::OperationRejected {
                    operation: operation.kind.clone(),
                    reason: Some("no_decision".into()),
                });
                return ExecutionResult::rejected(Some("no_decision".into()));
            }
        };

        let record = DecisionRecord::new(operation.clone(), choice.clone());
        if let Some(decisions) = &self.decisions {
            if let Err(e) = decisions.record(&record) {
                warn!(error = %e, "failed to record decision");
            }
        }
        self.events.publish(Event::DecisionRecorded {
            operation: operation.kind.clone(),
            approved: choice.approved,
        });

        if choice.approved {
            return self.run_auto(operation, DecisionMode::Manual).await;
        }

        warn!(
            op = %operation.kind,
            choice = %choice.label,
            reason = choice.reason.as_deref().unwrap_or("unspecified"),
            "operation rejected"
        );
        self.events.publish(Event::OperationRejected {
            operation: operation.kind.clone(),
            reason: choice.reason.clone(),
        });
        ExecutionResult::rejected(choice.reason)
    }

    /// checkpoint → perform → verify → trust → rollback/discard → audit.
    async fn run_auto(&self, operation: &Operation, mode: DecisionMode) -> ExecutionResult {
        let checkpoint = match &self.checkpoints {
            Some(manager) => manager.create_checkpoint().await,
            None => None,
        };

        let (success, record_trust, output, error, report) =
            match self.performer.perform(operation).await {
                Ok(output) => {
                    let (success, record_trust, report) = self.verify(operation).await;
                    (success, record_trust, Some(output), None, report)
                }
                Err(e) => {
                    warn!(op = %operation.kind, error = %e, "perform failed");
                    (false, true, None, Some(e.to_string()), None)
                }
            };

        if record_trust {
            self.trust.record_outcome(&operation.kind, success);
        }

        let rolled_back = match (&checkpoint, &self.checkpoints) {
            (Some(cp), Some(manager)) if !success => {
                let restored = manager.rollback(cp).await;
                if !restored {
                    warn!(label = %cp.label, "rollback failed; the workspace may hold partial changes");
                }
                Some(restored)
            }
            (Some(cp), Some(manager)) => {
                manager.discard(cp).await;
                None
            }
            _ => None,
        };

        let mut detail = json!({});
        if let Some(output) = &output {
            detail["result"] = output.clone();
        }
        if let Some(error) = &error {
            detail["error"] = Value::String(error.clone());
        }
        if let Some(report) = &report {
            detail["verification"] = json!(report);
        }
        if let Some(cp) = &checkpoint {
            detail["checkpoint"] = Value::String(cp.label.clone());
        }
        if let Some(restored) = rolled_back {
            detail["rolled_back"] = Value::Bool(restored);
        }
        self.append_audit(AuditEntry::new(operation.clone(), success, mode).with_detail(detail));

        self.events.publish(Event::OperationExecuted {
            operation: operation.kind.clone(),
            mode,
            success,
        });
        info!(op = %operation.kind, %mode, success, "operation finished");

        let reason = error.or_else(|| (!success).then(|| "verification failed".to_string()));
        ExecutionResult {
            result: output,
            reason,
            checkpoint: checkpoint.map(|cp| cp.label),
            rolled_back,
            ..ExecutionResult::new(
                if success {
                    ExecutionStatus::Success
                } else {
                    ExecutionStatus::Failed
                },
                mode,
            )
        }
    }

    /// `(success, record_trust, report)` for a performed operation.
    pub async fn verify(&self, operation: &Operation) -> (bool, bool, Option<VerificationReport>) {
        let profile = self.classifier.registry().profile(&operation.kind);
        let Some(verifier) = self.verifier.as_ref().filter(|_| profile.test_required) else {
            return (true, true, None);
        };

        let report = match verifier.verify(operation).await {
            Ok(report) => report,
            Err(e) => {
                warn!(op = %operation.kind, error = %e, "verification runner error");
                VerificationReport::failed(e.to_string())
            }
        };
        let (success, record_trust) = report.judge(self.config.verification.timeout_policy);
        if !success {
            warn!(op = %operation.kind, status = ?report.status, "verification failed");
        }
        (success, record_trust, Some(report))
    }

    fn notify(&self, operation: &Operation, result: &ExecutionResult) {
        info!(
            op = %operation.kind,
            description = %operation.description,
            status = %result.status,
            "notify: operation performed"
        );
        self.events.publish(Event::OperationNotified {
            operation: operation.kind.clone(),
            description: operation.description.clone(),
            success: result.is_success(),
        });
    }

    /// Record an audit entry, logging (not propagating) write failures.
    pub fn append_audit(&self, entry: AuditEntry) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.append(&entry) {
                warn!(error = %e, "failed to append audit entry");
            }
        }
    }
}

/// Assembles an [`Engine`]. Defaults: workspace performer, command verifier
/// when `verification.command` is set, `git stash` checkpoints when enabled,
/// a responder that declines every prompt, and state under
/// `persistence.state_dir`.
pub struct EngineBuilder {
    config: Arc<ReinConfig>,
    root: PathBuf,
    layout: Option<StateLayout>,
    performer: Arc<dyn Performer>,
    verifier: Option<Arc<dyn VerificationRunner>>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    responder: Arc<dyn Responder>,
    events: EventBus,
}

impl EngineBuilder {
    fn new(config: Arc<ReinConfig>, root: PathBuf) -> Self {
        let layout = StateLayout::new(&root, &config.persistence.state_dir);
        let performer: Arc<dyn Performer> =
            Arc::new(WorkspacePerformer::new(root.clone(), &config.performer));
        let verifier = CommandVerifier::from_config(root.clone(), &config.verification)
            .map(|v| Arc::new(v) as Arc<dyn VerificationRunner>);
        let snapshots = config.checkpoint.enabled.then(|| {
            let mut git = GitStash::new(
                root.clone(),
                Duration::from_secs(config.checkpoint.timeout_secs),
            );
            if config.persistence.state_dir.is_relative() {
                git = git.preserve(&config.persistence.state_dir);
            }
            Arc::new(git) as Arc<dyn SnapshotStore>
        });

        Self {
            layout: Some(layout),
            performer,
            verifier,
            snapshots,
            responder: Arc::new(ScriptedResponder::new()),
            events: EventBus::default(),
            config,
            root,
        }
    }

    /// Keep all state in memory; nothing is read from or written to disk.
    pub fn in_memory(mut self) -> Self {
        self.layout = None;
        self
    }

    pub fn state(mut self, layout: StateLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn performer(mut self, performer: Arc<dyn Performer>) -> Self {
        self.performer = performer;
        self
    }

    pub fn verifier(mut self, verifier: Option<Arc<dyn VerificationRunner>>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn snapshots(mut self, snapshots: Option<Arc<dyn SnapshotStore>>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = responder;
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> Engine {
        let config = self.config;
        let events = self.events;

        let mut trust = TrustTracker::new(config.autonomy.trust_window, config.autonomy.auto_threshold)
            .with_events(events.clone());
        let mut queue = DecisionQueue::new(&config.batching);
        if let Some(layout) = &self.layout {
            trust = trust.with_store(TrustStore::new(layout.trust_scores()));
            if config.persistence.persist_queue {
                queue = queue.with_persistence(JsonDocument::new(layout.queue()));
            }
        }

        let checkpoints = self
            .snapshots
            .filter(|_| config.checkpoint.enabled)
            .map(|store| CheckpointManager::new(store).with_events(events.clone()));

        debug!(
            root = ?self.root,
            persistent = self.layout.is_some(),
            checkpoints = checkpoints.is_some(),
            verifier = self.verifier.is_some(),
            "engine ready"
        );

        Engine {
            classifier: AutonomyClassifier::new(Arc::clone(&config)),
            trust,
            queue,
            checkpoints,
            performer: self.performer,
            verifier: self.verifier,
            responder: self.responder,
            audit: self.layout.clone().map(AuditLog::new),
            decisions: self.layout.clone().map(DecisionLog::new),
            layout: self.layout,
            events,
            root: self.root,
            config,
        }
    }
}
