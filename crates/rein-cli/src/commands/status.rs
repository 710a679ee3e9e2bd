use console::style;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use rein_autonomy::{OperationRegistry, ScriptedResponder};
use rein_config::ReinConfig;
use rein_core::DecisionMode;

use super::build_engine;

pub(super) fn cmd_check(config: &ReinConfig) -> rein_core::Result<()> {
    let autonomy = &config.autonomy;
    println!("{}", style("Thresholds").bold());
    println!("  auto     ≥ {:.0}%", autonomy.auto_threshold * 100.0);
    println!("  notify   ≥ {:.0}%", autonomy.notify_threshold * 100.0);
    println!("  window     last {} outcomes", autonomy.trust_window);
    println!(
        "  batch      {} queued or a keyword: {}",
        config.batching.max_queue_size,
        config.batching.priority_keywords.join(", ")
    );
    println!();

    println!("{}", style("Operation types").bold());
    let registry = OperationRegistry::new(Arc::new(config.clone()));
    for profile in registry.profiles() {
        println!(
            "  {:<22} {:<7} {}{}",
            profile.kind.to_string(),
            profile.base_level.to_string(),
            if profile.test_required { "tests required" } else { "" },
            if profile.configured { "" } else { " (built-in default)" }
        );
    }

    if !config.path_rules.is_empty() {
        println!();
        println!("{}", style("Path rules (first match wins)").bold());
        for rule in &config.path_rules {
            match rule.override_level {
                Some(level) => println!("  {:<22} → {level}", rule.pattern),
                None => println!("  {:<22} (no override)", rule.pattern),
            }
        }
    }
    Ok(())
}

/// Status a success rate earns on its own: auto, notify, or review.
fn status_for(config: &ReinConfig, rate: Option<f64>) -> Option<DecisionMode> {
    let rate = rate?;
    Some(if rate >= config.autonomy.auto_threshold {
        DecisionMode::Auto
    } else if rate >= config.autonomy.notify_threshold {
        DecisionMode::Notify
    } else {
        DecisionMode::Review
    })
}

pub(super) fn cmd_trust(config: Arc<ReinConfig>, root: &Path, json: bool) -> rein_core::Result<()> {
    let engine = build_engine(Arc::clone(&config), root, Arc::new(ScriptedResponder::new()));
    let stats = engine.trust().stats();

    if json {
        let rows: Vec<_> = stats
            .iter()
            .map(|s| {
                json!({
                    "type": s.kind,
                    "samples": s.samples,
                    "successes": s.successes,
                    "success_rate": s.success_rate,
                    "status": status_for(&config, s.success_rate),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if stats.is_empty() {
        println!("No execution history yet.");
        return Ok(());
    }

    println!("{}", style("Trust").bold());
    for s in &stats {
        let rate = s.success_rate.unwrap_or_default();
        let status = match status_for(&config, s.success_rate) {
            Some(DecisionMode::Auto) => style("auto").green(),
            Some(DecisionMode::Notify) => style("notify").cyan(),
            _ => style("review").yellow(),
        };
        println!(
            "  {:<22} {:>5.1}%  ({}/{})  {status}",
            s.kind.to_string(),
            rate * 100.0,
            s.successes,
            s.samples
        );
    }
    Ok(())
}

pub(super) fn cmd_audit(config: Arc<ReinConfig>, root: &Path, days: u32) -> rein_core::Result<()> {
    let engine = build_engine(config, root, Arc::new(ScriptedResponder::new()));
    let Some(audit) = engine.audit() else {
        println!("No audit log configured.");
        return Ok(());
    };
    let summary = audit.summary(days)?;

    println!("{} (last {days} days)", style("Audit").bold());
    println!("  executions   {}", summary.total);
    match (summary.auto_rate(), summary.success_rate()) {
        (Some(auto), Some(success)) => {
            println!("  automatic    {:.1}%", auto * 100.0);
            println!("  successful   {:.1}%", success * 100.0);
        }
        _ => println!("  no executions in this period"),
    }
    Ok(())
}
