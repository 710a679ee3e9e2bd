//! Continuous mode: turn workspace edits into operations.
//!
//! The notify watcher thread only forwards paths into an mpsc channel; a
//! single consumer debounces them and runs each through the engine, so
//! executions never overlap.

use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rein_config::schema::ObserverConfig;
use rein_core::{Event, ExecutionResult, Operation, OperationKind, ReinError, Result};

use crate::pipeline::Engine;

/// Map a changed file to an operation. Rules are checked in order; `None`
/// means the change is not acted on.
pub fn infer_operation(path: &Path) -> Option<Operation> {
    let text = path.to_string_lossy().replace('\\', "/");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| text.clone());

    let (kind, description) = if text.ends_with(".md") {
        (OperationKind::UpdateDocumentation, format!("Update documentation: {name}"))
    } else if text.contains("tests") || name.contains("_test.") {
        (OperationKind::AddFunction, format!("Test change: {name}"))
    } else if text.contains("src/core") {
        (OperationKind::ModifyCoreLogic, format!("Core file change: {name}"))
    } else if text.contains("src/utils") || text.contains("helpers") {
        (OperationKind::AddFunction, format!("Utility change: {name}"))
    } else {
        return None;
    };
    Some(Operation::new(kind, description).with_target(path))
}

pub struct ChangeObserver {
    engine: Arc<Engine>,
    paths: Vec<PathBuf>,
    ignore: Vec<String>,
    debounce: Duration,
    report_every: Duration,
    last_triggered: HashMap<PathBuf, Instant>,
}

impl ChangeObserver {
    pub fn new(engine: Arc<Engine>, config: &ObserverConfig) -> Self {
        let mut ignore = config.ignore.clone();
        let state_dir = engine.config().persistence.state_dir.to_string_lossy().into_owned();
        if !ignore.contains(&state_dir) {
            ignore.push(state_dir);
        }
        Self {
            engine,
            paths: config.paths.clone(),
            ignore,
            debounce: Duration::from_millis(config.debounce_ms),
            report_every: Duration::from_secs(config.queue_report_secs.max(1)),
            last_triggered: HashMap::new(),
        }
    }

    /// Replace the watched roots (relative to the project root).
    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        if !paths.is_empty() {
            self.paths = paths;
        }
        self
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.ignore
            .iter()
            .filter(|fragment| !fragment.is_empty())
            .any(|fragment| text.contains(fragment.as_str()))
    }

    /// Debounce: a path re-triggers only once `debounce` has passed since its
    /// last accepted event.
    pub fn should_process(&mut self, path: &Path, now: Instant) -> bool {
        if let Some(last) = self.last_triggered.get(path) {
            if now.saturating_duration_since(*last) < self.debounce {
                return false;
            }
        }
        self.last_triggered.insert(path.to_path_buf(), now);
        true
    }

    /// Handle one changed path. Returns the execution result when the change
    /// mapped to an operation.
    pub async fn process(&mut self, path: &Path) -> Option<ExecutionResult> {
        let relative = path
            .strip_prefix(self.engine.root())
            .unwrap_or(path)
            .to_path_buf();

        if self.is_ignored(&relative) {
            return None;
        }
        if !self.should_process(&relative, Instant::now()) {
            debug!(path = ?relative, "debounced");
            return None;
        }

        self.engine.events().publish(Event::ChangeDetected {
            path: relative.display().to_string(),
        });
        let operation = infer_operation(&relative)?;
        info!(path = ?relative, op = %operation.kind, "change detected");

        let result = self.engine.execute(operation).await;
        info!(path = ?relative, status = %result.status, "change handled");
        Some(result)
    }

    /// Watch until `shutdown` resolves.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::channel::<PathBuf>(256);

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<NotifyEvent, notify::Error>| {
                match res {
                    Ok(event) => {
                        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                            return;
                        }
                        for path in event.paths {
                            if path.is_dir() {
                                continue;
                            }
                            if tx.blocking_send(path).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "file watcher error"),
                }
            })
            .map_err(|e| ReinError::Watcher(format!("failed to create file watcher: {e}")))?;

        let mut watched = 0;
        for path in &self.paths {
            let full = self.engine.root().join(path);
            if !full.exists() {
                debug!(path = ?full, "watch root missing, skipping");
                continue;
            }
            watcher
                .watch(&full, RecursiveMode::Recursive)
                .map_err(|e| ReinError::Watcher(format!("failed to watch {}: {e}", full.display())))?;
            watched += 1;
        }
        if watched == 0 {
            return Err(ReinError::Watcher(format!(
                "none of the watch roots exist: {:?}",
                self.paths
            )));
        }
        info!(roots = ?self.paths, "watching for changes");

        let mut ticker = tokio::time::interval(self.report_every);
        ticker.tick().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("observer stopping");
                    self.engine.events().publish(Event::Shutdown);
                    break;
                }
                Some(path) = rx.recv() => {
                    self.process(&path).await;
                }
                _ = ticker.tick() => {
                    let queue_size = self.engine.queue().len();
                    if queue_size > 0 {
                        info!(queue_size, "decisions pending");
                        self.engine.events().publish(Event::QueuePending {
                            queue_size,
                            timestamp: chrono::Utc::now(),
                        });
                    }
                }
            }
        }

        drop(watcher);
        Ok(())
    }
}
