use std::path::Path;

use rein_store::StateLayout;

const TEMPLATE: &str = r#"# 🧭 Rein Configuration

[autonomy]
auto_threshold = 0.95     # success rate for unattended execution
notify_threshold = 0.80   # success rate for execute-then-notify
trust_window = 20         # outcomes kept per operation type

# Base level per operation type: auto | notify | review | manual
[operations.add-function]
autonomy_level = "notify"
test_required = true

[operations.fix-bug]
autonomy_level = "notify"
test_required = true

[operations.update-documentation]
autonomy_level = "auto"

[operations.refactor-module]
autonomy_level = "review"
test_required = true

[operations.add-dependency]
autonomy_level = "review"

[operations.modify-core-logic]
autonomy_level = "manual"
test_required = true

# Evaluated in order; the first matching pattern wins.
# A manual override cannot be lifted by a good track record.
[[path_rules]]
pattern = "src/core/**"
override_level = "manual"

[[path_rules]]
pattern = ".env*"
override_level = "manual"

[batching]
max_queue_size = 5
priority_keywords = ["security", "breaking", "urgent", "critical"]

[checkpoint]
enabled = true            # git stash snapshots around automatic runs
# timeout_secs = 30

[verification]
# command = "cargo test --quiet"
tests_dir = "tests"
# timeout_secs = 60
timeout_policy = "fail-open"   # fail-open | fail-closed | skip

[performer]
dependency_manifest = "requirements.txt"
# create_missing_core = true

[observer]
paths = ["src", "tests", "docs"]
# debounce_ms = 2000
# queue_report_secs = 10

[persistence]
state_dir = ".rein"
# persist_queue = false

[logging]
level = "info"
# format = "pretty"   # pretty | json | compact
"#;

/// Write a starter rein.toml next to the project and create the state tree.
pub(super) fn cmd_init(root: &Path, config_path: &Path, state_dir: &Path) -> rein_core::Result<()> {
    if config_path.exists() {
        println!("⚠️  {} already exists", config_path.display());
    } else {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, TEMPLATE)?;
        println!("✅ Created {}", config_path.display());
    }

    let layout = StateLayout::new(root, state_dir);
    layout.ensure_dirs()?;
    println!("✅ State directory {}", layout.root().display());
    println!("   Next: rein check, then rein execute <type> --file <path>");
    Ok(())
}
