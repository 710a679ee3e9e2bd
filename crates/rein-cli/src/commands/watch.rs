use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use rein_config::ReinConfig;
use rein_core::Event;
use rein_runtime::ChangeObserver;

use super::{build_engine, interactive_responder};

pub(super) async fn cmd_watch(
    config: Arc<ReinConfig>,
    root: &Path,
    paths: Vec<PathBuf>,
) -> rein_core::Result<()> {
    let roots: Vec<String> = if paths.is_empty() {
        &config.observer.paths
    } else {
        &paths
    }
    .iter()
    .map(|p| p.display().to_string())
    .collect();

    let engine = Arc::new(build_engine(Arc::clone(&config), root, interactive_responder()));
    let observer = ChangeObserver::new(Arc::clone(&engine), &config.observer).with_paths(paths);

    println!("🧭 Rein v{} watching {}", env!("CARGO_PKG_VERSION"), root.display());
    println!("   Roots: {}", roots.join(", "));
    println!("   Press Ctrl+C to stop.");
    println!();

    // Surface notifications and pending reviews while the observer runs
    let mut events = engine.events().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(Event::OperationNotified {
                    operation,
                    description,
                    success,
                }) => {
                    let mark = if success { "✅" } else { "❌" };
                    println!("{mark} {} {description}", style(operation).cyan());
                }
                Ok(Event::QueuePending { queue_size, .. }) => {
                    println!(
                        "📋 {} operations pending, run {} to decide",
                        queue_size,
                        style("rein approve").bold()
                    );
                }
                Ok(Event::RolledBack { label, restored }) if !restored => {
                    println!("⚠️  {}", style(format!("rollback of {label} failed")).red());
                }
                Ok(Event::Shutdown) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    let outcome = observer.run(shutdown).await;
    printer.abort();
    outcome?;

    println!("👋 Stopped.");
    Ok(())
}
