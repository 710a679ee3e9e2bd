use thiserror::Error;

/// Unified error type for the entire Rein workspace.
#[derive(Error, Debug)]
pub enum ReinError {
    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Store errors ───────────────────────────────────────────
    #[error("store error: {path}: {reason}")]
    Store { path: String, reason: String },

    // ── Execution errors ───────────────────────────────────────
    #[error("perform failed: {kind}: {reason}")]
    Perform { kind: String, reason: String },

    #[error("verification runner error: {0}")]
    Verification(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    // ── Human-in-the-loop errors ───────────────────────────────
    #[error("prompt error: {0}")]
    Prompt(String),

    // ── Observer errors ────────────────────────────────────────
    #[error("watcher error: {0}")]
    Watcher(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ReinError {
    /// Shorthand for a store error on a given path.
    pub fn store(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::Store {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReinError>;
