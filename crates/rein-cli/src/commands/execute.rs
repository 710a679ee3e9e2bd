use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rein_autonomy::ScriptedResponder;
use rein_config::ReinConfig;
use rein_core::{ExecutionResult, ExecutionStatus, Operation, OperationKind, ReinError};
use rein_runtime::{CheckpointManager, GitStash};

use super::{build_engine, interactive_responder};
use crate::responder::describe_entry;

pub(super) async fn cmd_execute(
    config: Arc<ReinConfig>,
    root: &Path,
    kind: String,
    description: Option<String>,
    file: Option<PathBuf>,
    payload: Option<String>,
    json: bool,
) -> rein_core::Result<()> {
    let kind = OperationKind::parse(&kind);
    let description = description.unwrap_or_else(|| kind.to_string());
    let mut operation = Operation::new(kind, description);
    if let Some(file) = file {
        operation = operation.with_target(file);
    }
    if let Some(raw) = payload {
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| ReinError::Config(format!("--payload is not valid JSON: {e}")))?;
        operation = operation.with_payload(value);
    }

    let responder = if json {
        Arc::new(ScriptedResponder::new()) as Arc<dyn rein_autonomy::Responder>
    } else {
        interactive_responder()
    };
    let engine = build_engine(config, root, responder);
    let result = engine.execute(operation).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &ExecutionResult) {
    let mode = style(result.decision_mode).bold();
    match result.status {
        ExecutionStatus::Success => println!("✅ {} ({mode})", style("performed").green()),
        ExecutionStatus::Failed => println!("❌ {} ({mode})", style("failed").red()),
        ExecutionStatus::Queued => println!(
            "📋 {} ({} pending, run `rein approve` to decide)",
            style("queued for review").yellow(),
            result.queue_size.unwrap_or_default()
        ),
        ExecutionStatus::Rejected => println!("🛑 {}", style("rejected").red()),
    }
    if let Some(reason) = &result.reason {
        println!("   reason: {reason}");
    }
    if let Some(label) = &result.checkpoint {
        println!("   checkpoint: {label}");
    }
    match result.rolled_back {
        Some(true) => println!("   ↩️  changes rolled back"),
        Some(false) => println!(
            "   ⚠️  {}",
            style("rollback failed; the working tree may hold partial changes").red()
        ),
        None => {}
    }
    if let Some(output) = &result.result {
        println!("   result: {output}");
    }
}

pub(super) fn cmd_queue(config: Arc<ReinConfig>, root: &Path, json: bool) -> rein_core::Result<()> {
    let persisted = config.persistence.persist_queue;
    let engine = build_engine(config, root, Arc::new(ScriptedResponder::new()));
    let entries = engine.queue().snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if !persisted {
        println!("💡 persistence.persist_queue is off; the queue only lives inside `rein watch`.");
    }
    if entries.is_empty() {
        println!("No operations waiting for review.");
        return Ok(());
    }

    println!(
        "📋 {} ({} of {} before a batch review)",
        style("Decision queue").bold(),
        entries.len(),
        engine.queue().max_queue_size()
    );
    for (i, entry) in entries.iter().enumerate() {
        println!("   {}", describe_entry(i, entry));
        println!(
            "       {}",
            style(entry.enqueued_at.format("queued %Y-%m-%d %H:%M:%S UTC")).dim()
        );
    }
    Ok(())
}

pub(super) async fn cmd_approve(config: Arc<ReinConfig>, root: &Path) -> rein_core::Result<()> {
    let engine = build_engine(config, root, interactive_responder());
    if engine.queue().is_empty() {
        println!("No operations waiting for review.");
        return Ok(());
    }

    let outcome = engine.present_batch().await;
    println!();
    println!("{}: {}", style("Decision").bold(), outcome.choice);
    for result in &outcome.results {
        print_result(result);
    }
    if outcome.dropped > 0 {
        println!("🗑️  {} operations dropped", outcome.dropped);
    }
    if outcome.remaining > 0 {
        println!("📋 {} operations still queued", outcome.remaining);
    }
    Ok(())
}

pub(super) async fn cmd_rollback(
    config: Arc<ReinConfig>,
    root: &Path,
    label: Option<String>,
) -> rein_core::Result<()> {
    let mut git = GitStash::new(root, Duration::from_secs(config.checkpoint.timeout_secs));
    if config.persistence.state_dir.is_relative() {
        git = git.preserve(&config.persistence.state_dir);
    }
    let manager = CheckpointManager::new(Arc::new(git));

    let Some(label) = label else {
        let labels = manager.list().await?;
        if labels.is_empty() {
            println!("No checkpoints.");
        }
        for label in labels {
            println!("  {label}");
        }
        return Ok(());
    };

    if manager.rollback_label(&label).await {
        println!("↩️  Restored {label}");
        Ok(())
    } else {
        Err(ReinError::Checkpoint(format!("could not restore '{label}'")))
    }
}
