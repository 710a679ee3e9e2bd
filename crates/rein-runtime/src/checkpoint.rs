//! Checkpoints around automatic execution.
//!
//! The versioned storage itself is external. [`GitStash`] keeps snapshots as
//! labelled `git stash` entries, so they stay visible in `git stash list`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use rein_core::{Event, EventBus, ReinError, Result};

/// Prefix shared by every checkpoint label.
pub const LABEL_PREFIX: &str = "_rollback_point_";

/// Reference to a snapshot taken before an automatic execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// A versioned-snapshot primitive.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Snapshot every uncommitted change (tracked and untracked) under
    /// `label`, leaving the working tree as it was. `Ok(false)` when there is
    /// nothing to snapshot.
    async fn snapshot(&self, label: &str) -> Result<bool>;

    /// Throw away changes made since the snapshot and restore it. The
    /// snapshot is consumed.
    async fn restore(&self, label: &str) -> Result<()>;

    /// Forget the snapshot without touching the working tree.
    async fn discard(&self, label: &str) -> Result<()>;

    /// Labels of snapshots that still exist, newest first.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Creates, restores and discards checkpoints. Never fails the caller: every
/// problem is logged and reported as `None`/`false`.
pub struct CheckpointManager {
    store: Arc<dyn SnapshotStore>,
    counter: AtomicU64,
    events: Option<EventBus>,
}

impl CheckpointManager {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            counter: AtomicU64::new(0),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Timestamp, pid and a per-manager counter: unique across concurrent
    /// processes sharing one repository.
    pub fn next_label(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!(
            "{LABEL_PREFIX}{}_{}_{n}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            std::process::id()
        )
    }

    pub async fn create_checkpoint(&self) -> Option<Checkpoint> {
        let label = self.next_label();
        match self.store.snapshot(&label).await {
            Ok(true) => {
                debug!(%label, "checkpoint created");
                if let Some(events) = &self.events {
                    events.publish(Event::CheckpointCreated {
                        label: label.clone(),
                    });
                }
                Some(Checkpoint {
                    label,
                    created_at: Utc::now(),
                })
            }
            Ok(false) => {
                debug!("nothing to snapshot, continuing without checkpoint");
                None
            }
            Err(e) => {
                warn!(error = %e, "could not create checkpoint");
                None
            }
        }
    }

    pub async fn rollback(&self, checkpoint: &Checkpoint) -> bool {
        self.rollback_label(&checkpoint.label).await
    }

    /// Restore a checkpoint by label (used by `rein rollback`).
    pub async fn rollback_label(&self, label: &str) -> bool {
        let restored = match self.store.restore(label).await {
            Ok(()) => {
                info!(%label, "rolled back to checkpoint");
                true
            }
            Err(e) => {
                warn!(%label, error = %e, "rollback failed");
                false
            }
        };
        if let Some(events) = &self.events {
            events.publish(Event::RolledBack {
                label: label.to_string(),
                restored,
            });
        }
        restored
    }

    pub async fn discard(&self, checkpoint: &Checkpoint) {
        if let Err(e) = self.store.discard(&checkpoint.label).await {
            warn!(label = %checkpoint.label, error = %e, "could not discard checkpoint");
        }
    }

    /// Checkpoint labels that can still be restored.
    pub async fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|l| l.starts_with(LABEL_PREFIX))
            .collect())
    }
}

// ── git stash ──────────────────────────────────────────────────

/// Snapshots kept as `git stash` entries in the project repository.
pub struct GitStash {
    root: PathBuf,
    timeout: Duration,
    /// Paths never stashed nor cleaned, e.g. the state directory.
    preserve: Vec<String>,
}

impl GitStash {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
            preserve: Vec::new(),
        }
    }

    pub fn preserve(mut self, path: impl AsRef<Path>) -> Self {
        self.preserve
            .push(path.as_ref().to_string_lossy().trim_end_matches('/').to_string());
        self
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        let mut cmd = tokio::process::Command::new("git");
        cmd.args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                ReinError::Checkpoint(format!(
                    "git {} timed out after {}s",
                    args.first().unwrap_or(&""),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ReinError::Checkpoint(format!("cannot run git: {e}")))?;

        if !output.status.success() {
            return Err(ReinError::Checkpoint(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `stash@{n}` for the entry carrying `label`.
    async fn find(&self, label: &str) -> Result<Option<String>> {
        let listing = self.git(&["stash", "list", "--format=%gd %s"]).await?;
        Ok(listing.lines().find_map(|line| {
            let (reference, subject) = line.split_once(' ')?;
            let rest = subject.strip_suffix(label)?;
            (rest.is_empty() || rest.ends_with(' ')).then(|| reference.to_string())
        }))
    }

    fn exclusions(&self) -> Vec<String> {
        self.preserve
            .iter()
            .map(|p| format!(":(exclude){p}"))
            .collect()
    }
}

/// `args -- . <exclusions>`: a git command limited to the project root.
fn scoped<'a>(args: &[&'a str], exclusions: &'a [String]) -> Vec<&'a str> {
    let mut scoped = args.to_vec();
    scoped.extend(["--", "."]);
    scoped.extend(exclusions.iter().map(String::as_str));
    scoped
}

#[async_trait]
impl SnapshotStore for GitStash {
    async fn snapshot(&self, label: &str) -> Result<bool> {
        self.git(&["rev-parse", "--is-inside-work-tree"]).await?;

        let exclusions = self.exclusions();
        let status = self
            .git(&scoped(&["status", "--porcelain"], &exclusions))
            .await?;
        if status.trim().is_empty() {
            return Ok(false);
        }

        self.git(&scoped(
            &["stash", "push", "--include-untracked", "-m", label],
            &exclusions,
        ))
        .await?;

        let reference = self
            .find(label)
            .await?
            .ok_or_else(|| ReinError::Checkpoint(format!("stash '{label}' missing after push")))?;
        // Put the changes back, index included; the stash entry stays as the snapshot.
        self.git(&["stash", "apply", "--index", "--quiet", &reference]).await?;
        Ok(true)
    }

    async fn restore(&self, label: &str) -> Result<()> {
        let reference = self
            .find(label)
            .await?
            .ok_or_else(|| ReinError::Checkpoint(format!("no checkpoint named '{label}'")))?;

        // Reset only the snapshot's pathspec; the rest of the repository is
        // not ours to touch.
        let exclusions = self.exclusions();

        // `git restore` rejects a pathspec that matches nothing known to git.
        let tracked = !self
            .git(&scoped(&["ls-files"], &exclusions))
            .await?
            .trim()
            .is_empty()
            || !self
                .git(&["ls-tree", "-r", "--name-only", "HEAD", "--", "."])
                .await?
                .trim()
                .is_empty();
        if tracked {
            let restore = ["restore", "--quiet", "--source=HEAD", "--staged", "--worktree"];
            self.git(&scoped(&restore, &exclusions)).await?;
        }
        self.git(&scoped(&["clean", "-fd", "--quiet"], &exclusions)).await?;
        self.git(&["stash", "pop", "--index", "--quiet", &reference]).await?;
        Ok(())
    }

    async fn discard(&self, label: &str) -> Result<()> {
        match self.find(label).await? {
            Some(reference) => {
                self.git(&["stash", "drop", "--quiet", &reference]).await?;
                Ok(())
            }
            None => Err(ReinError::Checkpoint(format!("no checkpoint named '{label}'"))),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let listing = self.git(&["stash", "list", "--format=%s"]).await?;
        Ok(listing
            .lines()
            .filter_map(|subject| {
                subject
                    .find(LABEL_PREFIX)
                    .map(|at| subject[at..].trim().to_string())
            })
            .collect())
    }
}
