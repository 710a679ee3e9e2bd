use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The four decision modes, ordered from least to most autonomous:
///
/// - **Manual**: blocks until a human picks one of a fixed set of choices.
/// - **Review**: queued for batched human review, not performed yet.
/// - **Notify**: performed immediately, a human is told afterwards.
/// - **Auto**: performed immediately without notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionMode {
    Manual = 0,
    Review = 1,
    Notify = 2,
    Auto = 3,
}

impl DecisionMode {
    pub const ALL: [DecisionMode; 4] = [Self::Manual, Self::Review, Self::Notify, Self::Auto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Review => "review",
            Self::Notify => "notify",
            Self::Auto => "auto",
        }
    }

    /// Whether operations in this mode are performed without waiting on a human.
    pub fn executes_immediately(&self) -> bool {
        matches!(self, Self::Auto | Self::Notify)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Manual => "Blocks until a human approves",
            Self::Review => "Queued for batched human review",
            Self::Notify => "Performed immediately, human notified afterwards",
            Self::Auto => "Performed immediately",
        }
    }
}

impl fmt::Display for DecisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "review" => Ok(Self::Review),
            "notify" => Ok(Self::Notify),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown decision mode '{other}' (expected auto, notify, review or manual)"
            )),
        }
    }
}

/// The kind of change an operation proposes.
///
/// Tags are kebab-case on the wire (`add-function`); snake_case input
/// (`add_function`) is normalized on parse. Unrecognized tags are kept as
/// [`OperationKind::Other`] so the rules file can introduce new kinds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    AddFunction,
    ModifyCoreLogic,
    RefactorModule,
    AddDependency,
    UpdateDocumentation,
    FixBug,
    Other(String),
}

impl OperationKind {
    pub const KNOWN: [OperationKind; 6] = [
        Self::AddFunction,
        Self::ModifyCoreLogic,
        Self::RefactorModule,
        Self::AddDependency,
        Self::UpdateDocumentation,
        Self::FixBug,
    ];

    /// Parse a type tag, normalizing case and separators.
    pub fn parse(tag: &str) -> Self {
        let normalized = normalize_tag(tag);
        match normalized.as_str() {
            "add-function" => Self::AddFunction,
            "modify-core-logic" => Self::ModifyCoreLogic,
            "refactor-module" => Self::RefactorModule,
            "add-dependency" => Self::AddDependency,
            "update-documentation" => Self::UpdateDocumentation,
            "fix-bug" => Self::FixBug,
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::AddFunction => "add-function",
            Self::ModifyCoreLogic => "modify-core-logic",
            Self::RefactorModule => "refactor-module",
            Self::AddDependency => "add-dependency",
            Self::UpdateDocumentation => "update-documentation",
            Self::FixBug => "fix-bug",
            Self::Other(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Lowercase, trim, and turn `_` / whitespace into `-`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
        .collect()
}

impl From<String> for OperationKind {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<&str> for OperationKind {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed change submitted to the execution pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Free text for display and keyword triggers. Never used for authorization.
    #[serde(default)]
    pub description: String,
    /// Filesystem path the operation affects, if any.
    #[serde(default, alias = "file_path", skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,
    /// Type-specific data, e.g. `{"package": "serde"}` for add-dependency.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Operation {
    pub fn new(kind: impl Into<OperationKind>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            target_path: None,
            payload: Value::Null,
        }
    }

    pub fn with_target(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// The text scanned for priority keywords: description and type only.
    pub fn trigger_text(&self) -> String {
        format!("{} {}", self.description, self.kind).to_lowercase()
    }

    /// A string field from the payload, e.g. `payload_str("package")`.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// One option of a structured single-choice prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub description: String,
    pub approved: bool,
    /// Reason code reported when a declining choice is picked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Choice {
    pub fn approve(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            approved: true,
            reason: None,
        }
    }

    pub fn decline(
        label: impl Into<String>,
        description: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            approved: false,
            reason: Some(reason.into()),
        }
    }
}

/// Final status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Queued,
    Rejected,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Queued => "queued",
            Self::Rejected => "rejected",
        })
    }
}

/// Structured result of `execute`. Every failure is reported here rather than
/// as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub decision_mode: DecisionMode,
    /// Output of the perform step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back: Option<bool>,
}

impl ExecutionResult {
    pub fn new(status: ExecutionStatus, decision_mode: DecisionMode) -> Self {
        Self {
            status,
            decision_mode,
            result: None,
            reason: None,
            queue_size: None,
            checkpoint: None,
            rolled_back: None,
        }
    }

    pub fn queued(queue_size: usize) -> Self {
        Self {
            queue_size: Some(queue_size),
            ..Self::new(ExecutionStatus::Queued, DecisionMode::Review)
        }
    }

    pub fn rejected(reason: Option<String>) -> Self {
        Self {
            reason,
            ..Self::new(ExecutionStatus::Rejected, DecisionMode::Manual)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Immutable record of one completed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub success: bool,
    pub decision_mode: DecisionMode,
    /// Raw detail: perform output or error, verification output, rollback outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl AuditEntry {
    pub fn new(operation: Operation, success: bool, decision_mode: DecisionMode) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            success,
            decision_mode,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Immutable record of a human answer to a manual-approval prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub choice: Choice,
    pub approved: bool,
}

impl DecisionRecord {
    pub fn new(operation: Operation, choice: Choice) -> Self {
        Self {
            timestamp: Utc::now(),
            approved: choice.approved,
            operation,
            choice,
        }
    }
}
