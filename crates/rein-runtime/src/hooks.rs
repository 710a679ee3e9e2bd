//! Editor/agent hook protocol.
//!
//! An external tool reports a file edit before (`pre`) and after (`post`) it
//! happens. `pre` answers whether the edit may proceed; `post` is the only
//! place where externally performed edits feed the trust history.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use rein_core::{AuditEntry, DecisionMode, Operation, OperationKind};

use crate::pipeline::Engine;

/// Tool invocation as reported by the hook caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolEvent {
    #[serde(default, alias = "tool_name")]
    pub name: String,
    #[serde(default, alias = "tool_input")]
    pub parameters: Value,
    #[serde(default, alias = "tool_response")]
    pub result: Value,
}

impl ToolEvent {
    pub fn file_path(&self) -> Option<&str> {
        self.parameters
            .get("file_path")
            .or_else(|| self.parameters.get("notebook_path"))
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Whether the tool reported a failure of its own.
    pub fn reported_error(&self) -> bool {
        match &self.result {
            Value::Object(map) => {
                map.get("is_error").and_then(Value::as_bool).unwrap_or(false)
                    || map.get("success").and_then(Value::as_bool) == Some(false)
                    || map.get("error").is_some_and(|e| !e.is_null())
            }
            _ => false,
        }
    }
}

const FILE_TOOLS: [&str; 3] = ["Write", "Edit", "NotebookEdit"];

/// Map a file-writing tool call to an operation.
pub fn infer_operation_from_tool(tool: &str, file_path: &str) -> Option<Operation> {
    if file_path.is_empty() {
        return None;
    }
    let path = Path::new(file_path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string());
    let in_core = file_path.contains("src/core");

    let (kind, description) = match tool {
        "Write" => {
            if file_path.contains("tests") || name.contains("_test.") {
                (OperationKind::AddFunction, format!("Create test file: {name}"))
            } else if file_path.ends_with(".md") {
                (OperationKind::UpdateDocumentation, format!("Update documentation: {name}"))
            } else if in_core {
                (OperationKind::ModifyCoreLogic, format!("Create core file: {name}"))
            } else {
                (OperationKind::AddFunction, format!("Create file: {name}"))
            }
        }
        "Edit" | "NotebookEdit" => {
            if in_core {
                (OperationKind::ModifyCoreLogic, format!("Modify core file: {name}"))
            } else {
                (OperationKind::AddFunction, format!("Modify file: {name}"))
            }
        }
        _ => return None,
    };
    Some(Operation::new(kind, description).with_target(file_path))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreCheckResponse {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_mode: Option<DecisionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreCheckResponse {
    fn allow(reason: &str) -> Self {
        Self {
            allowed: true,
            reason: Some(reason.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostCheckResponse {
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_updated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PostCheckResponse {
    fn skipped(reason: &str) -> Self {
        Self {
            processed: false,
            reason: Some(reason.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    pub context_added: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Parse hook input. Hooks never block the caller on bad input.
pub fn parse_event(raw: &str) -> Result<ToolEvent, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Gate a tool call before it runs.
pub fn pre_check(engine: &Engine, event: &ToolEvent) -> PreCheckResponse {
    if !FILE_TOOLS.contains(&event.name.as_str()) {
        return PreCheckResponse::allow("not a file operation");
    }
    let Some(file_path) = event.file_path() else {
        return PreCheckResponse::allow("no file path");
    };
    let Some(operation) = infer_operation_from_tool(&event.name, file_path) else {
        return PreCheckResponse::allow("operation type could not be inferred");
    };

    let classification = engine.classify(&operation);
    let mode = classification.mode;
    debug!(tool = %event.name, file = file_path, %mode, "pre-check");

    let mut response = PreCheckResponse {
        operation: Some(operation.kind.clone()),
        file_path: Some(file_path.to_string()),
        decision_mode: Some(mode),
        ..PreCheckResponse::default()
    };

    match mode {
        DecisionMode::Manual => {
            info!(op = %operation.kind, file = file_path, "blocked: manual approval required");
            response.allowed = false;
            response.reason = Some(format!(
                "manual approval required ({})",
                classification.reason()
            ));
            response.suggestion = Some(format!(
                "rein execute {} --file {}",
                operation.kind, file_path
            ));
        }
        DecisionMode::Review => {
            let queue_size = engine.enqueue(operation);
            response.allowed = true;
            response.queued = Some(true);
            response.message = Some(format!("queued for review ({queue_size} pending)"));
        }
        DecisionMode::Auto | DecisionMode::Notify => {
            response.allowed = true;
            response.message = Some(format!("allowed ({mode})"));
        }
    }
    response
}

/// Measure an externally performed edit and record the outcome.
pub async fn post_check(engine: &Engine, event: &ToolEvent) -> PostCheckResponse {
    if !FILE_TOOLS.contains(&event.name.as_str()) {
        return PostCheckResponse::skipped("not a file operation");
    }
    let Some(operation) = event
        .file_path()
        .and_then(|path| infer_operation_from_tool(&event.name, path))
    else {
        return PostCheckResponse::skipped("operation type could not be inferred");
    };

    let (success, record_trust, report) = if event.reported_error() {
        (false, true, None)
    } else {
        engine.verify(&operation).await
    };
    if record_trust {
        engine.trust().record_outcome(&operation.kind, success);
    }

    let mode = engine.classify(&operation).mode;
    let mut detail = serde_json::json!({"source": "hook", "tool": event.name});
    if let Some(report) = &report {
        detail["verification"] = serde_json::json!(report);
    }
    engine.append_audit(AuditEntry::new(operation.clone(), success, mode).with_detail(detail));

    if success {
        PostCheckResponse {
            processed: true,
            success: Some(true),
            trust_updated: Some(record_trust),
            ..PostCheckResponse::default()
        }
    } else {
        warn!(op = %operation.kind, "external edit failed verification");
        PostCheckResponse {
            processed: true,
            success: Some(false),
            action: Some("rollback_suggested".into()),
            message: Some("operation failed; rolling back is recommended".into()),
            trust_updated: Some(record_trust),
            ..PostCheckResponse::default()
        }
    }
}

/// Context for a submitted prompt: the types trusted enough to run unattended.
pub fn prompt_context(engine: &Engine) -> PromptContext {
    let trusted = engine.trust().promotable();
    if trusted.is_empty() {
        return PromptContext::default();
    }

    let mut lines = vec![
        "# Automation status".to_string(),
        String::new(),
        "These operations meet the auto-execution threshold:".to_string(),
    ];
    lines.extend(trusted.iter().map(|s| {
        let rate = s.success_rate.unwrap_or_default() * 100.0;
        format!("  - {}: auto ({rate:.0}%)", s.kind)
    }));
    PromptContext {
        context_added: true,
        context: Some(lines.join("\n")),
    }
}
