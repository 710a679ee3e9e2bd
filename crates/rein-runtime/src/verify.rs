use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

use rein_config::schema::{TimeoutPolicy, VerificationConfig};
use rein_core::{Operation, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Passed,
    Failed,
    /// The runner could not be started.
    Unavailable,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub status: VerificationStatus,
    /// Diagnostic text, e.g. the tail of the test output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl VerificationReport {
    pub fn passed() -> Self {
        Self {
            status: VerificationStatus::Passed,
            output: None,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Failed,
            output: Some(output.into()),
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Apply the timeout policy. Returns `(success, record_trust)`.
    pub fn judge(&self, policy: TimeoutPolicy) -> (bool, bool) {
        match self.status {
            VerificationStatus::Passed => (true, true),
            VerificationStatus::Failed => (false, true),
            VerificationStatus::Unavailable | VerificationStatus::TimedOut => match policy {
                TimeoutPolicy::FailOpen => (true, true),
                TimeoutPolicy::FailClosed => (false, true),
                TimeoutPolicy::Skip => (true, false),
            },
        }
    }
}

/// Checks the workspace after an operation was performed.
#[async_trait]
pub trait VerificationRunner: Send + Sync {
    async fn verify(&self, operation: &Operation) -> Result<VerificationReport>;
}

/// Runs a shell command (e.g. `cargo test`, `pytest -x`) in the project root.
pub struct CommandVerifier {
    root: PathBuf,
    command: String,
    tests_dir: PathBuf,
    timeout: Duration,
}

const STDOUT_TAIL: usize = 4_000;
const STDERR_TAIL: usize = 2_000;

impl CommandVerifier {
    pub fn new(root: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            command: command.into(),
            tests_dir: PathBuf::from("tests"),
            timeout: Duration::from_secs(60),
        }
    }

    /// `None` when no command is configured.
    pub fn from_config(root: impl Into<PathBuf>, config: &VerificationConfig) -> Option<Self> {
        let command = config.command.as_deref()?.trim();
        if command.is_empty() {
            return None;
        }
        Some(Self {
            root: root.into(),
            command: command.to_string(),
            tests_dir: config.tests_dir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tests_dir(mut self, tests_dir: impl Into<PathBuf>) -> Self {
        self.tests_dir = tests_dir.into();
        self
    }
}

#[async_trait]
impl VerificationRunner for CommandVerifier {
    async fn verify(&self, operation: &Operation) -> Result<VerificationReport> {
        if !self.root.join(&self.tests_dir).exists() {
            debug!(tests_dir = ?self.tests_dir, "no test suite, nothing to verify");
            return Ok(VerificationReport::passed().with_output("no test suite"));
        }

        info!(op = %operation.kind, command = %self.command, "running verification");
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "verification timed out");
                return Ok(VerificationReport {
                    status: VerificationStatus::TimedOut,
                    output: Some(format!("timed out after {}s", self.timeout.as_secs())),
                });
            }
            Ok(Err(e)) => {
                warn!(error = %e, "verification runner unavailable");
                return Ok(VerificationReport {
                    status: VerificationStatus::Unavailable,
                    output: Some(e.to_string()),
                });
            }
            Ok(Ok(output)) => output,
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = tail(&String::from_utf8_lossy(&output.stdout), STDOUT_TAIL);
        let stderr = tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL);
        let diagnostic = format!("Exit code: {exit_code}\n\nSTDOUT:\n{stdout}\n\nSTDERR:\n{stderr}");

        // 127: `sh` could not find the runner program.
        let status = match exit_code {
            0 => VerificationStatus::Passed,
            127 => VerificationStatus::Unavailable,
            _ => VerificationStatus::Failed,
        };
        debug!(exit_code, ?status, "verification finished");
        Ok(VerificationReport {
            status,
            output: Some(diagnostic),
        })
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
