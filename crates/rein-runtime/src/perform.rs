use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use rein_config::schema::PerformerConfig;
use rein_core::{Operation, OperationKind, ReinError, Result};

/// Carries out an approved operation against the workspace.
///
/// The returned JSON is kept in the execution result and the audit log.
#[async_trait]
pub trait Performer: Send + Sync {
    async fn perform(&self, operation: &Operation) -> Result<Value>;
}

/// File-level performer for a project directory.
///
/// - add-dependency appends `payload.package` to the dependency manifest.
/// - add-function, update-documentation and fix-bug make sure the target
///   exists, writing a stub when it does not.
/// - modify-core-logic creates a missing target only when allowed.
/// - refactor-module requires an existing target.
/// - anything else is a no-op.
pub struct WorkspacePerformer {
    root: PathBuf,
    manifest: PathBuf,
    create_missing_core: bool,
}

impl WorkspacePerformer {
    pub fn new(root: impl Into<PathBuf>, config: &PerformerConfig) -> Self {
        Self {
            root: root.into(),
            manifest: config.dependency_manifest.clone(),
            create_missing_core: config.create_missing_core,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    async fn add_dependency(&self, operation: &Operation) -> Result<Value> {
        let package = operation
            .payload_str("package")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ReinError::Perform {
                kind: operation.kind.to_string(),
                reason: "payload has no 'package'".into(),
            })?;

        let manifest = self.resolve(&self.manifest);
        let existing = match tokio::fs::read_to_string(&manifest).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        if existing.lines().any(|line| declares(line, package)) {
            debug!(package, "dependency already declared");
            return Ok(json!({
                "package": package,
                "added": false,
                "reason": "already_exists",
                "file": self.manifest,
            }));
        }

        let mut content = existing.trim_end().to_string();
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(package);
        content.push('\n');
        write_file(&manifest, &content).await?;
        info!(package, manifest = ?self.manifest, "dependency added");
        Ok(json!({"package": package, "added": true, "file": self.manifest}))
    }

    async fn ensure_target(&self, operation: &Operation, target: &Path) -> Result<Value> {
        let path = self.resolve(target);
        let existed = tokio::fs::try_exists(&path).await?;

        match &operation.kind {
            OperationKind::AddFunction
            | OperationKind::UpdateDocumentation
            | OperationKind::FixBug => {
                if !existed {
                    write_file(&path, &stub(&path, &operation.description)).await?;
                }
                Ok(json!({"file": target, "action": "created_or_updated", "created": !existed}))
            }
            OperationKind::ModifyCoreLogic => {
                if existed {
                    return Ok(json!({"file": target, "action": "modified"}));
                }
                if !self.create_missing_core {
                    return Err(ReinError::Perform {
                        kind: operation.kind.to_string(),
                        reason: format!("core module not found: {}", target.display()),
                    });
                }
                write_file(&path, &stub(&path, &operation.description)).await?;
                Ok(json!({"file": target, "action": "created", "created": true}))
            }
            OperationKind::RefactorModule => {
                if !existed {
                    return Err(ReinError::Perform {
                        kind: operation.kind.to_string(),
                        reason: format!("module not found: {}", target.display()),
                    });
                }
                Ok(json!({"file": target, "action": "refactored"}))
            }
            _ => Ok(noop(operation)),
        }
    }
}

#[async_trait]
impl Performer for WorkspacePerformer {
    async fn perform(&self, operation: &Operation) -> Result<Value> {
        if operation.kind == OperationKind::AddDependency {
            return self.add_dependency(operation).await;
        }
        match &operation.target_path {
            Some(target) => self.ensure_target(operation, target).await,
            None => Ok(noop(operation)),
        }
    }
}

fn noop(operation: &Operation) -> Value {
    json!({"action": "noop", "operation": operation.kind})
}

/// `serde`, `serde==1.0`, `serde>=1 ; python_version>"3"` and `serde[derive]`
/// all declare `serde`.
fn declares(line: &str, package: &str) -> bool {
    let line = line.trim();
    match line.strip_prefix(package) {
        Some(rest) => rest.is_empty() || rest.starts_with(['=', '<', '>', '~', '!', '[', ' ', ';', '@']),
        None => false,
    }
}

fn stub(path: &Path, description: &str) -> String {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "md" | "markdown" => format!("# {description}\n"),
        "rs" | "js" | "ts" | "go" | "c" | "h" | "cpp" | "java" | "kt" | "swift" => {
            format!("// {description}\n")
        }
        "py" => format!("\"\"\"{description}\"\"\"\n"),
        _ => format!("# {description}\n"),
    }
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}
