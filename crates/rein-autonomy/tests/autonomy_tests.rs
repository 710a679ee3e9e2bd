#[cfg(test)]
mod tests {
    use rein_config::ReinConfig;
    use rein_config::schema::{OperationRule, PathRule};
    use rein_core::{DecisionMode, Operation, OperationKind};
    use std::sync::Arc;

    fn config() -> ReinConfig {
        ReinConfig::default()
    }

    // ── Path patterns ──────────────────────────────────────────

    mod glob {
        use rein_autonomy::PathPattern;

        #[test]
        fn test_single_star_stays_in_segment() {
            let p = PathPattern::new("src/core/*").unwrap();
            assert!(p.matches_str("src/core/auth.py"));
            assert!(!p.matches_str("src/core/nested/auth.py"));
        }

        #[test]
        fn test_double_star_crosses_segments() {
            let p = PathPattern::new("src/core/**").unwrap();
            assert!(p.matches_str("src/core/nested/deep/auth.rs"));
            assert!(!p.matches_str("src/utils/helpers.rs"));
        }

        #[test]
        fn test_relative_pattern_matches_suffix() {
            let p = PathPattern::new("src/core/*").unwrap();
            assert!(p.matches_str("/work/project/src/core/auth.py"));
            assert!(p.matches_str("./src/core/auth.py"));
            assert!(!p.matches_str("/work/mysrc/core/auth.py"));
        }

        #[test]
        fn test_dotfile_pattern() {
            let p = PathPattern::new(".env*").unwrap();
            assert!(p.matches_str(".env"));
            assert!(p.matches_str("config/.env.local"));
            assert!(!p.matches_str("environment.md"));
        }

        #[test]
        fn test_question_mark_and_literal_dots() {
            let p = PathPattern::new("v?.txt").unwrap();
            assert!(p.matches_str("v1.txt"));
            assert!(!p.matches_str("v1xtxt"));
        }

        #[test]
        fn test_absolute_pattern_is_anchored() {
            let p = PathPattern::new("/etc/*").unwrap();
            assert!(p.matches_str("/etc/passwd"));
            assert!(!p.matches_str("/home/etc/passwd"));
        }
    }

    // ── Operation registry ─────────────────────────────────────

    mod registry {
        use super::*;
        use rein_autonomy::OperationRegistry;

        #[test]
        fn test_unknown_type_defaults_to_review() {
            let registry = OperationRegistry::new(Arc::new(config()));
            let profile = registry.profile(&OperationKind::parse("rename-symbol"));
            assert_eq!(profile.base_level, DecisionMode::Review);
            assert!(!profile.test_required);
            assert!(!profile.configured);
        }

        #[test]
        fn test_builtin_choice_sets() {
            let registry = OperationRegistry::new(Arc::new(config()));

            let dep = registry.profile(&OperationKind::AddDependency).choices;
            let reasons: Vec<_> = dep.iter().map(|c| c.reason.as_deref()).collect();
            assert_eq!(reasons, vec![None, Some("dependency_rejected"), Some("deferred")]);
            assert!(dep[0].approved);

            let core = registry.profile(&OperationKind::ModifyCoreLogic).choices;
            assert_eq!(core[1].reason.as_deref(), Some("needs_refactor"));
            assert_eq!(core[2].reason.as_deref(), Some("rejected"));

            let other = registry.profile(&OperationKind::FixBug).choices;
            assert_eq!(other[1].reason.as_deref(), Some("needs_change"));
        }

        #[test]
        fn test_configured_choices_replace_builtin() {
            let mut cfg = config();
            let mut rule = OperationRule::new(DecisionMode::Manual, false);
            rule.choices = vec![rein_core::Choice::approve("Ship it", "go")];
            cfg.operations.insert("fix-bug".into(), rule);
            let registry = OperationRegistry::new(Arc::new(cfg));
            let profile = registry.profile(&OperationKind::FixBug);
            assert_eq!(profile.choices.len(), 1);
            assert_eq!(profile.base_level, DecisionMode::Manual);
        }

        #[test]
        fn test_kinds_include_custom_types_once() {
            let mut cfg = config();
            cfg.operations
                .insert("rename_symbol".into(), OperationRule::new(DecisionMode::Auto, false));
            cfg.operations
                .insert("add_function".into(), OperationRule::new(DecisionMode::Auto, false));
            let registry = OperationRegistry::new(Arc::new(cfg));
            let kinds = registry.kinds();
            assert_eq!(kinds.len(), 7);
            assert!(kinds.contains(&OperationKind::Other("rename-symbol".into())));
        }
    }

    // ── Trust tracker ──────────────────────────────────────────

    mod trust {
        use super::*;
        use rein_autonomy::TrustTracker;
        use rein_core::{Event, EventBus};
        use rein_store::TrustStore;

        #[test]
        fn test_no_history_has_no_rate() {
            let tracker = TrustTracker::new(20, 0.95);
            assert!(tracker.success_rate(&OperationKind::AddFunction).is_none());
            assert!(tracker.stats().is_empty());
        }

        #[test]
        fn test_window_is_bounded() {
            let tracker = TrustTracker::new(20, 0.95);
            let kind = OperationKind::FixBug;
            for i in 0..30 {
                tracker.record_outcome(&kind, i >= 10);
                assert!(tracker.history(&kind).len() <= 20);
            }
            // The 10 early failures have all rolled out.
            assert_eq!(tracker.success_rate(&kind), Some(1.0));
        }

        #[test]
        fn test_rate_over_partial_window() {
            let tracker = TrustTracker::new(20, 0.95);
            let kind = OperationKind::AddFunction;
            tracker.record_outcome(&kind, true);
            tracker.record_outcome(&kind, true);
            tracker.record_outcome(&kind, false);
            let rate = tracker.record_outcome(&kind, true);
            assert_eq!(rate, 0.75);
            assert_eq!(tracker.success_rate(&kind), Some(0.75));
        }

        #[test]
        fn test_types_are_independent() {
            let tracker = TrustTracker::new(20, 0.95);
            tracker.record_outcome(&OperationKind::AddFunction, true);
            tracker.record_outcome(&OperationKind::FixBug, false);
            assert_eq!(tracker.success_rate(&OperationKind::AddFunction), Some(1.0));
            assert_eq!(tracker.success_rate(&OperationKind::FixBug), Some(0.0));
            assert_eq!(tracker.stats().len(), 2);
        }

        #[test]
        fn test_history_survives_reload() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("trust/scores.json");
            {
                let tracker = TrustTracker::new(20, 0.95).with_store(TrustStore::new(&path));
                tracker.record_outcome(&OperationKind::AddDependency, true);
                tracker.record_outcome(&OperationKind::AddDependency, false);
            }
            let tracker = TrustTracker::new(20, 0.95).with_store(TrustStore::new(&path));
            assert_eq!(tracker.success_rate(&OperationKind::AddDependency), Some(0.5));
            assert!(TrustStore::new(&path).load().last_updated.is_some());
        }

        #[test]
        fn test_reload_normalizes_snake_case_keys() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("scores.json");
            std::fs::write(
                &path,
                r#"{"operation_history": {"add_function": [
                    {"timestamp": "2026-01-01T00:00:00Z", "success": true},
                    {"timestamp": "2026-01-02T00:00:00Z", "success": false}
                ]}}"#,
            )
            .unwrap();
            let tracker = TrustTracker::new(20, 0.95).with_store(TrustStore::new(&path));
            assert_eq!(tracker.success_rate(&OperationKind::AddFunction), Some(0.5));
        }

        #[test]
        fn test_unwritable_store_keeps_memory_state() {
            let dir = tempfile::tempdir().unwrap();
            // A directory where the file should be makes every save fail.
            let path = dir.path().join("scores.json");
            std::fs::create_dir_all(&path).unwrap();
            let tracker = TrustTracker::new(20, 0.95).with_store(TrustStore::new(&path));
            tracker.record_outcome(&OperationKind::FixBug, true);
            assert_eq!(tracker.success_rate(&OperationKind::FixBug), Some(1.0));
        }

        #[tokio::test]
        async fn test_promotion_suggested_at_threshold() {
            let bus = EventBus::new(64);
            let mut rx = bus.subscribe();
            let tracker = TrustTracker::new(20, 0.95).with_events(bus);
            tracker.record_outcome(&OperationKind::UpdateDocumentation, true);

            match rx.recv().await.unwrap() {
                Event::PromotionSuggested {
                    operation,
                    success_rate,
                } => {
                    assert_eq!(operation, OperationKind::UpdateDocumentation);
                    assert_eq!(success_rate, 1.0);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        #[test]
        fn test_promotable_lists_types_over_threshold() {
            let tracker = TrustTracker::new(20, 0.95);
            tracker.record_outcome(&OperationKind::AddFunction, true);
            tracker.record_outcome(&OperationKind::FixBug, false);
            let promotable = tracker.promotable();
            assert_eq!(promotable.len(), 1);
            assert_eq!(promotable[0].kind, OperationKind::AddFunction);
        }
    }

    // ── Classifier ─────────────────────────────────────────────

    mod classifier {
        use super::*;
        use rein_autonomy::{AutonomyClassifier, TrustTracker};

        fn record(tracker: &TrustTracker, kind: &OperationKind, successes: usize, total: usize) {
            for i in 0..total {
                tracker.record_outcome(kind, i < successes);
            }
        }

        #[test]
        fn test_unknown_type_without_history_is_review() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let tracker = TrustTracker::new(20, 0.95);
            let op = Operation::new("rename-symbol", "rename");
            assert_eq!(classifier.classify(&op, &tracker), DecisionMode::Review);
        }

        #[test]
        fn test_base_level_without_history() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let tracker = TrustTracker::new(20, 0.95);
            let op = Operation::new(OperationKind::AddDependency, "add client");
            assert_eq!(classifier.classify(&op, &tracker), DecisionMode::Review);
            let op = Operation::new(OperationKind::UpdateDocumentation, "readme");
            assert_eq!(classifier.classify(&op, &tracker), DecisionMode::Auto);
        }

        #[test]
        fn test_high_trust_escalates_to_auto() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let tracker = TrustTracker::new(20, 0.95);
            let kind = OperationKind::AddFunction;
            record(&tracker, &kind, 19, 20);
            let op = Operation::new(kind, "helper").with_target("src/utils/helpers.py");
            let explained = classifier.explain(&op, &tracker);
            assert_eq!(explained.mode, DecisionMode::Auto);
            assert!(explained.escalated);
        }

        #[test]
        fn test_medium_trust_is_notify() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let tracker = TrustTracker::new(20, 0.95);
            record(&tracker, &OperationKind::RefactorModule, 17, 20);
            let op = Operation::new(OperationKind::RefactorModule, "split");
            assert_eq!(classifier.classify(&op, &tracker), DecisionMode::Notify);
        }

        #[test]
        fn test_low_trust_keeps_rule_level() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let tracker = TrustTracker::new(20, 0.95);
            record(&tracker, &OperationKind::UpdateDocumentation, 1, 2);
            let op = Operation::new(OperationKind::UpdateDocumentation, "readme");
            assert_eq!(classifier.classify(&op, &tracker), DecisionMode::Auto);
        }

        #[test]
        fn test_manual_path_override_beats_trust() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let tracker = TrustTracker::new(20, 0.95);
            let kind = OperationKind::AddFunction;
            record(&tracker, &kind, 20, 20);
            let op = Operation::new(kind, "touch core").with_target("src/core/auth.py");
            let explained = classifier.explain(&op, &tracker);
            assert_eq!(explained.mode, DecisionMode::Manual);
            assert_eq!(explained.path_override.as_deref(), Some("src/core/**"));
            assert!(!explained.escalated);
        }

        #[test]
        fn test_first_matching_path_rule_wins() {
            let mut cfg = config();
            cfg.path_rules = vec![
                PathRule {
                    pattern: "docs/**".into(),
                    override_level: None,
                },
                PathRule::new("docs/internal/*", DecisionMode::Review),
                PathRule::new("docs/**", DecisionMode::Auto),
            ];
            let classifier = AutonomyClassifier::new(Arc::new(cfg));
            let tracker = TrustTracker::new(20, 0.95);
            let op = Operation::new(OperationKind::FixBug, "typo").with_target("docs/internal/a.md");
            let explained = classifier.explain(&op, &tracker);
            assert_eq!(explained.mode, DecisionMode::Review);
            assert_eq!(explained.path_override.as_deref(), Some("docs/internal/*"));
        }

        #[test]
        fn test_non_manual_path_override_can_escalate() {
            let mut cfg = config();
            cfg.path_rules = vec![PathRule::new("src/legacy/**", DecisionMode::Review)];
            let classifier = AutonomyClassifier::new(Arc::new(cfg));
            let tracker = TrustTracker::new(20, 0.95);
            record(&tracker, &OperationKind::FixBug, 20, 20);
            let op = Operation::new(OperationKind::FixBug, "x").with_target("src/legacy/a.rs");
            assert_eq!(classifier.classify(&op, &tracker), DecisionMode::Auto);
        }

        #[test]
        fn test_type_level_manual_is_escalated_by_trust() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let tracker = TrustTracker::new(20, 0.95);
            record(&tracker, &OperationKind::ModifyCoreLogic, 20, 20);
            let op = Operation::new(OperationKind::ModifyCoreLogic, "no target");
            assert_eq!(classifier.classify(&op, &tracker), DecisionMode::Auto);
        }

        #[test]
        fn test_mode_is_monotonic_in_rate() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let op = Operation::new(OperationKind::AddDependency, "dep");
            let mut previous = DecisionMode::Manual;
            for step in 0..=20 {
                let rate = step as f64 / 20.0;
                let mode = classifier.classify_with_rate(&op, Some(rate)).mode;
                assert!(mode >= previous, "mode dropped at rate {rate}");
                previous = mode;
            }
        }

        #[test]
        fn test_raising_auto_threshold_never_loosens() {
            let op = Operation::new(OperationKind::AddFunction, "helper");
            for step in 0..=20 {
                let rate = step as f64 / 20.0;
                let mut loose = config();
                loose.autonomy.auto_threshold = 0.9;
                let mut strict = config();
                strict.autonomy.auto_threshold = 0.99;
                let loose_mode = AutonomyClassifier::new(Arc::new(loose))
                    .classify_with_rate(&op, Some(rate))
                    .mode;
                let strict_mode = AutonomyClassifier::new(Arc::new(strict))
                    .classify_with_rate(&op, Some(rate))
                    .mode;
                assert!(strict_mode <= loose_mode);
            }
        }

        #[test]
        fn test_reason_mentions_path_rule() {
            let classifier = AutonomyClassifier::new(Arc::new(config()));
            let op = Operation::new(OperationKind::FixBug, "x").with_target(".env.local");
            let explained = classifier.classify_with_rate(&op, None);
            assert_eq!(explained.mode, DecisionMode::Manual);
            assert!(explained.reason().contains(".env*"));
            assert!(explained.reason().contains("no history"));
        }
    }

    // ── Decision queue ─────────────────────────────────────────

    mod queue {
        use super::*;
        use rein_autonomy::{DecisionQueue, QueueContext, QueueEntry, TriggerReason};
        use rein_config::schema::BatchingConfig;
        use rein_store::JsonDocument;

        fn batching(max: usize) -> BatchingConfig {
            BatchingConfig {
                max_queue_size: max,
                ..Default::default()
            }
        }

        fn entry(description: &str) -> QueueEntry {
            QueueEntry::new(
                Operation::new(OperationKind::AddDependency, description),
                QueueContext::default(),
            )
        }

        #[test]
        fn test_size_trigger() {
            let queue = DecisionQueue::new(&batching(3));
            queue.enqueue(entry("one"));
            queue.enqueue(entry("two"));
            assert!(!queue.should_trigger());
            assert_eq!(queue.enqueue(entry("three")), 3);
            assert_eq!(
                queue.trigger_reason(),
                Some(TriggerReason::QueueFull { len: 3, max: 3 })
            );
        }

        #[test]
        fn test_keyword_trigger() {
            let queue = DecisionQueue::new(&batching(100));
            queue.enqueue(entry("Patch SECURITY hole in auth"));
            match queue.trigger_reason() {
                Some(TriggerReason::PriorityKeyword { keyword, .. }) => {
                    assert_eq!(keyword, "security")
                }
                other => panic!("unexpected trigger {other:?}"),
            }
        }

        #[test]
        fn test_payload_never_triggers() {
            let queue = DecisionQueue::new(&batching(100));
            let op = Operation::new(OperationKind::AddDependency, "add scanner")
                .with_payload(serde_json::json!({"package": "security-scanner"}));
            queue.enqueue(QueueEntry::new(op, QueueContext::default()));
            assert!(!queue.should_trigger());
        }

        #[test]
        fn test_drain_and_remove() {
            let queue = DecisionQueue::new(&batching(10));
            let first = entry("a");
            let id = first.id;
            queue.enqueue(first);
            queue.enqueue(entry("b"));
            assert_eq!(queue.remove(id).unwrap().operation.description, "a");
            assert!(queue.remove(id).is_none());
            let drained = queue.drain();
            assert_eq!(drained.len(), 1);
            assert!(queue.is_empty());
            assert_eq!(queue.clear(), 0);
        }

        #[test]
        fn test_persisted_queue_is_restored() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("queue.json");
            {
                let queue = DecisionQueue::new(&batching(10))
                    .with_persistence(JsonDocument::new(&path));
                queue.enqueue(entry("a"));
                queue.enqueue(entry("b"));
            }
            let queue = DecisionQueue::new(&batching(10)).with_persistence(JsonDocument::new(&path));
            let entries = queue.snapshot();
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[1].operation.description, "b");

            queue.clear();
            let queue = DecisionQueue::new(&batching(10)).with_persistence(JsonDocument::new(&path));
            assert!(queue.is_empty());
        }

        #[test]
        fn test_context_gather() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join("tests/unit")).unwrap();
            std::fs::write(dir.path().join("tests/test_api.py"), "").unwrap();
            std::fs::write(dir.path().join("tests/unit/model_test.py"), "").unwrap();
            std::fs::write(dir.path().join("tests/conftest.py"), "").unwrap();
            std::fs::write(dir.path().join("main.py"), "print(1)\n").unwrap();

            let op = Operation::new(OperationKind::FixBug, "x").with_target("main.py");
            let ctx = QueueContext::gather(&op, dir.path(), std::path::Path::new("tests"));
            assert_eq!(ctx.file_exists, Some(true));
            assert_eq!(ctx.file_size, Some(9));
            assert!(ctx.file_modified.is_some());
            assert!(ctx.has_tests);
            assert_eq!(ctx.test_count, Some(2));
        }

        #[test]
        fn test_context_for_missing_target() {
            let dir = tempfile::tempdir().unwrap();
            let op = Operation::new(OperationKind::FixBug, "x").with_target("nope.py");
            let ctx = QueueContext::gather(&op, dir.path(), std::path::Path::new("tests"));
            assert_eq!(ctx.file_exists, Some(false));
            assert!(!ctx.has_tests);
            assert!(ctx.test_count.is_none());
        }
    }

    // ── Responders ─────────────────────────────────────────────

    mod responder {
        use super::*;
        use rein_autonomy::registry::default_choices;
        use rein_autonomy::{BatchChoice, Responder, ScriptedResponder};

        #[tokio::test]
        async fn test_scripted_choices_in_order() {
            let responder = ScriptedResponder::new().with_choices([2, 0]);
            let op = Operation::new(OperationKind::AddDependency, "dep");
            let choices = default_choices(&op.kind);
            let first = responder.present_options(&op, &choices).await.unwrap();
            assert_eq!(first.reason.as_deref(), Some("deferred"));
            let second = responder.present_options(&op, &choices).await.unwrap();
            assert!(second.approved);
        }

        #[tokio::test]
        async fn test_exhausted_script_declines() {
            let responder = ScriptedResponder::new();
            let op = Operation::new(OperationKind::ModifyCoreLogic, "core");
            let choice = responder
                .present_options(&op, &default_choices(&op.kind))
                .await
                .unwrap();
            assert!(!choice.approved);
            assert_eq!(responder.present_batch(&[]).await.unwrap(), BatchChoice::Defer);
            assert!(!responder.continue_review(3).await.unwrap());
            assert_eq!(
                responder.prompts(),
                vec!["options:modify-core-logic", "batch:0", "continue:3"]
            );
        }

        #[tokio::test]
        async fn test_out_of_range_index_is_an_error() {
            let responder = ScriptedResponder::new().with_choices([7]);
            let op = Operation::new(OperationKind::FixBug, "bug");
            assert!(responder
                .present_options(&op, &default_choices(&op.kind))
                .await
                .is_err());
        }

        #[test]
        fn test_batch_choice_labels() {
            assert_eq!(BatchChoice::ALL.len(), 4);
            assert_eq!(BatchChoice::ReviewIndividually.to_string(), "Review individually");
        }
    }
}
