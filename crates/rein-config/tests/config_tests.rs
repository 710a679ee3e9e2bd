#[cfg(test)]
mod tests {
    use rein_config::ConfigLoader;
    use rein_config::schema::*;
    use rein_core::{DecisionMode, OperationKind};
    use std::io::Write;

    // ── Default tests ──────────────────────────────────────────

    #[test]
    fn test_autonomy_defaults() {
        let config = AutonomyConfig::default();
        assert_eq!(config.auto_threshold, 0.95);
        assert_eq!(config.notify_threshold, 0.80);
        assert_eq!(config.trust_window, 20);
    }

    #[test]
    fn test_default_operations() {
        let config = ReinConfig::default();
        let dep = config.operation_rule(&OperationKind::AddDependency).unwrap();
        assert_eq!(dep.autonomy_level, DecisionMode::Review);
        assert!(!dep.test_required);
        let core = config.operation_rule(&OperationKind::ModifyCoreLogic).unwrap();
        assert_eq!(core.autonomy_level, DecisionMode::Manual);
        assert!(core.test_required);
    }

    #[test]
    fn test_default_verification_is_fail_open_without_runner() {
        let config = VerificationConfig::default();
        assert!(config.command.is_none());
        assert_eq!(config.timeout_policy, TimeoutPolicy::FailOpen);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_default_queue_is_volatile() {
        let config = PersistenceConfig::default();
        assert!(!config.persist_queue);
        assert_eq!(config.state_dir, std::path::PathBuf::from(".rein"));
    }

    #[test]
    fn test_defaults_validate() {
        assert!(ReinConfig::default().validate().is_ok());
    }

    // ── Rule lookup ────────────────────────────────────────────

    #[test]
    fn test_operation_rule_accepts_snake_case_keys() {
        let toml_str = r#"
[operations.add_dependency]
autonomy_level = "manual"
"#;
        let config: ReinConfig = toml::from_str(toml_str).unwrap();
        let rule = config.operation_rule(&OperationKind::AddDependency).unwrap();
        assert_eq!(rule.autonomy_level, DecisionMode::Manual);
    }

    #[test]
    fn test_unknown_operation_has_no_rule() {
        let config = ReinConfig::default();
        assert!(config.operation_rule(&OperationKind::parse("rename-symbol")).is_none());
    }

    #[test]
    fn test_rule_without_level_defaults_to_review() {
        let toml_str = r#"
[operations.rename-symbol]
test_required = true
"#;
        let config: ReinConfig = toml::from_str(toml_str).unwrap();
        let rule = config.operation_rule(&OperationKind::parse("rename_symbol")).unwrap();
        assert_eq!(rule.autonomy_level, DecisionMode::Review);
        assert!(rule.test_required);
    }

    // ── TOML parsing ───────────────────────────────────────────

    #[test]
    fn test_path_rules_keep_order() {
        let toml_str = r#"
[[path_rules]]
pattern = "src/core/**"
override_level = "manual"

[[path_rules]]
pattern = "**/*.md"
override_level = "auto"

[[path_rules]]
pattern = "vendor/**"
"#;
        let config: ReinConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.path_rules.len(), 3);
        assert_eq!(config.path_rules[0].pattern, "src/core/**");
        assert_eq!(config.path_rules[1].override_level, Some(DecisionMode::Auto));
        assert!(config.path_rules[2].override_level.is_none());
    }

    #[test]
    fn test_partial_toml_applies_defaults() {
        let toml_str = r#"
[autonomy]
auto_threshold = 0.9

[batching]
max_queue_size = 3
"#;
        let config: ReinConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.autonomy.auto_threshold, 0.9);
        assert_eq!(config.autonomy.notify_threshold, 0.80);
        assert_eq!(config.batching.max_queue_size, 3);
        assert!(!config.batching.priority_keywords.is_empty());
        assert_eq!(config.checkpoint.timeout_secs, 30);
    }

    #[test]
    fn test_custom_choices_parse() {
        let toml_str = r#"
[operations.add-dependency]
autonomy_level = "manual"

[[operations.add-dependency.choices]]
label = "Approve"
description = "Add it"
approved = true

[[operations.add-dependency.choices]]
label = "Vendor"
description = "Vendor the code instead"
approved = false
reason = "vendor_instead"
"#;
        let config: ReinConfig = toml::from_str(toml_str).unwrap();
        let rule = config.operation_rule(&OperationKind::AddDependency).unwrap();
        assert_eq!(rule.choices.len(), 2);
        assert_eq!(rule.choices[1].reason.as_deref(), Some("vendor_instead"));
    }

    #[test]
    fn test_timeout_policy_kebab_case() {
        let toml_str = r#"
[verification]
command = "cargo test"
timeout_policy = "fail-closed"
"#;
        let config: ReinConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.verification.timeout_policy, TimeoutPolicy::FailClosed);
        assert_eq!(config.verification.command.as_deref(), Some("cargo test"));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = ReinConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: ReinConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(restored.autonomy.auto_threshold, config.autonomy.auto_threshold);
        assert_eq!(restored.path_rules.len(), config.path_rules.len());
        assert_eq!(restored.operations.len(), config.operations.len());
    }

    // ── Validation ─────────────────────────────────────────────

    #[test]
    fn test_threshold_ordering_is_an_error() {
        let mut config = ReinConfig::default();
        config.autonomy.auto_threshold = 0.5;
        config.autonomy.notify_threshold = 0.8;
        let err = config.validate().unwrap_err();
        assert!(err.contains("notify_threshold"));
    }

    #[test]
    fn test_threshold_range_is_an_error() {
        let mut config = ReinConfig::default();
        config.autonomy.auto_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_queue_size_is_an_error() {
        let mut config = ReinConfig::default();
        config.batching.max_queue_size = 0;
        assert!(config.validate().unwrap_err().contains("max_queue_size"));
    }

    #[test]
    fn test_empty_pattern_is_an_error() {
        let mut config = ReinConfig::default();
        config.path_rules.push(PathRule::new("  ", DecisionMode::Auto));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_format_warns() {
        let mut config = ReinConfig::default();
        config.logging.format = "xml".into();
        let warnings = config.validate().unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| w.field == "logging.format" && w.severity == WarningSeverity::Warning)
        );
    }

    #[test]
    fn test_warning_display_includes_hint() {
        let w = ConfigWarning {
            field: "batching.max_queue_size".into(),
            message: "queue size is zero".into(),
            severity: WarningSeverity::Error,
            hint: Some("Set to e.g. 5".into()),
        };
        let s = w.to_string();
        assert!(s.contains("batching.max_queue_size"));
        assert!(s.contains("Set to e.g. 5"));
    }

    // ── ConfigLoader tests ─────────────────────────────────────

    #[test]
    fn test_config_loader_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("rein.toml");
        let mut f = std::fs::File::create(&config_path).unwrap();
        writeln!(
            f,
            r#"
[autonomy]
auto_threshold = 0.9
notify_threshold = 0.7

[operations.add-function]
autonomy_level = "auto"
test_required = false
"#
        )
        .unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path()), dir.path()).unwrap();
        let config = loader.get();
        assert_eq!(config.autonomy.auto_threshold, 0.9);
        assert_eq!(config.autonomy.notify_threshold, 0.7);
        let rule = config.operation_rule(&OperationKind::AddFunction).unwrap();
        assert_eq!(rule.autonomy_level, DecisionMode::Auto);
        assert_eq!(loader.path(), config_path.as_path());
    }

    #[test]
    fn test_config_loader_reads_legacy_json_rules() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("rules.json");
        std::fs::write(
            &config_path,
            r#"{
  "autonomy": {"auto_threshold": 0.95, "notify_threshold": 0.8},
  "operations": {"add_dependency": {"autonomy_level": "review", "test_required": false}},
  "path_rules": [{"pattern": "src/core/*", "override_level": "manual"}],
  "batching": {"max_queue_size": 3, "priority_keywords": ["security"]}
}"#,
        )
        .unwrap();

        let loader = ConfigLoader::load(Some(config_path.as_path()), dir.path()).unwrap();
        let config = loader.shared();
        assert_eq!(config.batching.max_queue_size, 3);
        assert_eq!(config.path_rules[0].override_level, Some(DecisionMode::Manual));
        assert!(config.operation_rule(&OperationKind::AddDependency).is_some());
    }

    #[test]
    fn test_path_rules_map_form_keeps_document_order() {
        let json = r#"{
  "path_rules": {
    "src/core/*": {"override_level": "manual"},
    "docs/*": {"override_level": "auto"},
    "scratch/*": {}
  }
}"#;
        let config = ConfigLoader::parse(json, std::path::Path::new("rules.json")).unwrap();
        let patterns: Vec<&str> = config.path_rules.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["src/core/*", "docs/*", "scratch/*"]);
        assert!(config.path_rules[2].override_level.is_none());
    }

    #[test]
    fn test_config_loader_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let loader = ConfigLoader::load(Some(missing.as_path()), dir.path()).unwrap();
        assert_eq!(loader.get().batching.max_queue_size, 5);
    }

    #[test]
    fn test_config_loader_unparsable_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("rein.toml");
        std::fs::write(&config_path, "this is = = not toml").unwrap();
        let loader = ConfigLoader::load(Some(config_path.as_path()), dir.path()).unwrap();
        assert_eq!(loader.get().autonomy.auto_threshold, 0.95);
    }

    #[test]
    fn test_config_loader_rejects_invalid_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("rein.toml");
        std::fs::write(
            &config_path,
            "[autonomy]\nauto_threshold = 0.5\nnotify_threshold = 0.9\n",
        )
        .unwrap();
        assert!(ConfigLoader::load(Some(config_path.as_path()), dir.path()).is_err());
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        let root = std::path::Path::new("/project");
        let explicit = std::path::Path::new("/elsewhere/rules.toml");
        assert_eq!(ConfigLoader::resolve_path(Some(explicit), root), explicit);
    }

    // ── JSON roundtrip ─────────────────────────────────────────

    #[test]
    fn test_config_json_roundtrip() {
        let config = ReinConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: ReinConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.batching.max_queue_size, config.batching.max_queue_size);
    }
}
