//! Interactive answers from the terminal.

use async_trait::async_trait;
use console::style;
use dialoguer::{Confirm, Select, theme::ColorfulTheme};

use rein_autonomy::{BatchChoice, QueueEntry};
use rein_core::{Choice, Operation, ReinError, Result};

/// Prompts on the controlling terminal. Each prompt runs on the blocking pool
/// so the runtime keeps serving the watcher channel meanwhile.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalResponder;

impl TerminalResponder {
    pub fn new() -> Self {
        Self
    }
}

fn prompt_error(e: impl std::fmt::Display) -> ReinError {
    ReinError::Prompt(e.to_string())
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, dialoguer::Error> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(prompt_error)?
        .map_err(prompt_error)
}

/// One-line rendering of a queued entry with its captured context.
pub fn describe_entry(index: usize, entry: &QueueEntry) -> String {
    let op = &entry.operation;
    let mut line = format!(
        "{:>2}. {} {}",
        index + 1,
        style(&op.kind).cyan(),
        op.description
    );
    if let Some(target) = &op.target_path {
        line.push_str(&format!("  {}", style(target.display()).dim()));
    }
    let ctx = &entry.context;
    match ctx.file_exists {
        Some(true) => line.push_str(&format!(
            "  [{} bytes]",
            ctx.file_size.unwrap_or_default()
        )),
        Some(false) => line.push_str("  [new file]"),
        None => {}
    }
    if ctx.has_tests {
        line.push_str(&format!("  [{} test files]", ctx.test_count.unwrap_or_default()));
    }
    line
}

#[async_trait]
impl rein_autonomy::Responder for TerminalResponder {
    async fn present_options(&self, operation: &Operation, choices: &[Choice]) -> Result<Choice> {
        println!();
        println!(
            "🛑 {} {}",
            style("Manual approval required:").bold().red(),
            operation.description
        );
        println!("   type: {}", operation.kind);
        if let Some(target) = &operation.target_path {
            println!("   file: {}", target.display());
        }

        let items: Vec<String> = choices
            .iter()
            .map(|c| format!("{} — {}", c.label, c.description))
            .collect();
        let index = blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Decision")
                .items(items)
                .default(0)
                .interact()
        })
        .await?;

        choices
            .get(index)
            .cloned()
            .ok_or_else(|| ReinError::Prompt(format!("choice {index} out of range")))
    }

    async fn present_batch(&self, entries: &[QueueEntry]) -> Result<BatchChoice> {
        println!();
        println!(
            "📋 {} ({} pending)",
            style("Decision queue").bold(),
            entries.len()
        );
        for (i, entry) in entries.iter().enumerate() {
            println!("   {}", describe_entry(i, entry));
        }
        println!();

        let items: Vec<String> = BatchChoice::ALL
            .iter()
            .map(|c| format!("{} — {}", c.label(), c.description()))
            .collect();
        let index = blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt("What should happen to the queue?")
                .items(items)
                .default(3)
                .interact()
        })
        .await?;

        BatchChoice::ALL
            .get(index)
            .copied()
            .ok_or_else(|| ReinError::Prompt(format!("choice {index} out of range")))
    }

    async fn continue_review(&self, remaining: usize) -> Result<bool> {
        blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("{remaining} left. Continue reviewing?"))
                .default(true)
                .interact()
        })
        .await
    }
}
