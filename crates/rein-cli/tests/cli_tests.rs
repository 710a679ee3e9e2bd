#[cfg(test)]
mod tests {
    mod parsing {
        use clap::Parser;
        use rein_cli::Cli;

        fn parses(args: &[&str]) -> bool {
            Cli::try_parse_from(std::iter::once("rein").chain(args.iter().copied())).is_ok()
        }

        #[test]
        fn test_execute_arguments() {
            assert!(parses(&["execute", "add-function"]));
            assert!(parses(&[
                "execute",
                "add-dependency",
                "-d",
                "add serde",
                "--payload",
                r#"{"package": "serde"}"#,
            ]));
            assert!(parses(&["execute", "modify-core-logic", "--file", "src/core/a.rs", "--json"]));
            assert!(!parses(&["execute"]));
        }

        #[test]
        fn test_global_flags() {
            assert!(parses(&["--verbose", "trust"]));
            assert!(parses(&["audit", "--days", "30", "--quiet"]));
            assert!(parses(&["-c", "rules.json", "check"]));
            assert!(!parses(&["--verbose", "--quiet", "trust"]));
        }

        #[test]
        fn test_hook_stages() {
            assert!(parses(&["hook", "pre", "--input", "event.json"]));
            assert!(parses(&["hook", "post", "-i", "-"]));
            assert!(parses(&["hook", "prompt", "--input", "-"]));
            assert!(!parses(&["hook", "during", "--input", "-"]));
        }

        #[test]
        fn test_other_commands() {
            assert!(parses(&["watch", "--paths", "src", "docs"]));
            assert!(parses(&["rollback"]));
            assert!(parses(&["rollback", "_rollback_point_20260101_120000_4242_0"]));
            assert!(parses(&["completions", "zsh"]));
            assert!(parses(&["config", "--json"]));
            assert!(!parses(&["audit", "--days", "soon"]));
        }
    }

    mod rendering {
        use rein_autonomy::{QueueContext, QueueEntry};
        use rein_cli::responder::describe_entry;
        use rein_core::{Operation, OperationKind};

        #[test]
        fn test_entry_line_shows_context() {
            console::set_colors_enabled(false);
            let entry = QueueEntry::new(
                Operation::new(OperationKind::AddDependency, "add serde").with_target("Cargo.toml"),
                QueueContext {
                    file_exists: Some(true),
                    file_size: Some(120),
                    has_tests: true,
                    test_count: Some(4),
                    ..QueueContext::default()
                },
            );
            let line = describe_entry(0, &entry);
            assert!(line.starts_with(" 1. add-dependency add serde"));
            assert!(line.contains("Cargo.toml"));
            assert!(line.contains("[120 bytes]"));
            assert!(line.contains("[4 test files]"));
        }
    }
}
