use rein_core::{Choice, DecisionMode, OperationKind, normalize_tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration — maps to `rein.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinConfig {
    pub autonomy: AutonomyConfig,
    /// Per-operation-type rules, keyed by type tag.
    pub operations: BTreeMap<String, OperationRule>,
    /// Path-glob overrides, evaluated in order; first match wins.
    #[serde(deserialize_with = "deserialize_path_rules")]
    pub path_rules: Vec<PathRule>,
    pub batching: BatchingConfig,
    pub checkpoint: CheckpointConfig,
    pub verification: VerificationConfig,
    pub performer: PerformerConfig,
    pub observer: ObserverConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

impl ReinConfig {
    /// Rule for an operation kind, matching tags regardless of `_`/`-` spelling.
    pub fn operation_rule(&self, kind: &OperationKind) -> Option<&OperationRule> {
        self.operations.get(kind.as_str()).or_else(|| {
            self.operations
                .iter()
                .find(|(tag, _)| normalize_tag(tag) == kind.as_str())
                .map(|(_, rule)| rule)
        })
    }
}

// ── Autonomy ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    /// Success rate (0-1) at or above which an operation type is auto-executed.
    pub auto_threshold: f64,
    /// Success rate (0-1) at or above which an operation type is executed with notification.
    pub notify_threshold: f64,
    /// Number of most recent outcomes kept per operation type.
    pub trust_window: usize,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            auto_threshold: 0.95,
            notify_threshold: 0.80,
            trust_window: 20,
        }
    }
}

// ── Operations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRule {
    /// Base autonomy level before path overrides and trust escalation.
    #[serde(default = "default_level")]
    pub autonomy_level: DecisionMode,
    /// Whether a verification run is required after the operation is performed.
    #[serde(default)]
    pub test_required: bool,
    /// Custom choice set for manual prompts (empty = built-in set for the type).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl OperationRule {
    pub fn new(autonomy_level: DecisionMode, test_required: bool) -> Self {
        Self {
            autonomy_level,
            test_required,
            choices: Vec::new(),
        }
    }
}

fn default_level() -> DecisionMode {
    DecisionMode::Review
}

fn default_operations() -> BTreeMap<String, OperationRule> {
    [
        (OperationKind::AddFunction, DecisionMode::Notify, true),
        (OperationKind::FixBug, DecisionMode::Notify, true),
        (OperationKind::UpdateDocumentation, DecisionMode::Auto, false),
        (OperationKind::RefactorModule, DecisionMode::Review, true),
        (OperationKind::AddDependency, DecisionMode::Review, false),
        (OperationKind::ModifyCoreLogic, DecisionMode::Manual, true),
    ]
    .into_iter()
    .map(|(kind, level, tests)| (kind.to_string(), OperationRule::new(level, tests)))
    .collect()
}

// ── Path rules ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRule {
    /// Glob pattern (`*`, `**`, `?`). Relative patterns match any path suffix.
    pub pattern: String,
    /// Level that replaces the operation type's base level on match.
    #[serde(default)]
    pub override_level: Option<DecisionMode>,
}

impl PathRule {
    pub fn new(pattern: impl Into<String>, level: DecisionMode) -> Self {
        Self {
            pattern: pattern.into(),
            override_level: Some(level),
        }
    }
}

/// Accepts either a list of rules or an object keyed by pattern
/// (`{"src/core/*": {"override_level": "manual"}}`), keeping document order.
fn deserialize_path_rules<'de, D>(deserializer: D) -> Result<Vec<PathRule>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{MapAccess, SeqAccess, Visitor};

    #[derive(Deserialize)]
    struct RuleBody {
        #[serde(default)]
        override_level: Option<DecisionMode>,
    }

    struct RulesVisitor;

    impl<'de> Visitor<'de> for RulesVisitor {
        type Value = Vec<PathRule>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a list of path rules or a map of pattern to rule")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut rules = Vec::new();
            while let Some(rule) = seq.next_element::<PathRule>()? {
                rules.push(rule);
            }
            Ok(rules)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut rules = Vec::new();
            while let Some((pattern, body)) = map.next_entry::<String, RuleBody>()? {
                rules.push(PathRule {
                    pattern,
                    override_level: body.override_level,
                });
            }
            Ok(rules)
        }
    }

    deserializer.deserialize_any(RulesVisitor)
}

fn default_path_rules() -> Vec<PathRule> {
    vec![
        PathRule::new("src/core/**", DecisionMode::Manual),
        PathRule::new(".env*", DecisionMode::Manual),
    ]
}

// ── Batching ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Queue length at which the batch prompt is presented.
    pub max_queue_size: usize,
    /// Substrings of type/description that force immediate batch presentation.
    pub priority_keywords: Vec<String>,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 5,
            priority_keywords: vec![
                "security".into(),
                "breaking".into(),
                "urgent".into(),
                "critical".into(),
            ],
        }
    }
}

// ── Checkpoints ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Create a snapshot before auto-executed operations.
    pub enabled: bool,
    /// Timeout for snapshot and restore commands.
    pub timeout_secs: u64,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 30,
        }
    }
}

// ── Verification ───────────────────────────────────────────────

/// What a verification timeout (or an unavailable runner) counts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeoutPolicy {
    /// Treat as a pass.
    FailOpen,
    /// Treat as a failure (rollback, trust decreases).
    FailClosed,
    /// Treat as a pass without recording an outcome.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Shell command that verifies the project (e.g. "cargo test --quiet").
    /// None = no verification runner.
    pub command: Option<String>,
    /// Directory whose absence means "no test suite"; verification is skipped.
    pub tests_dir: PathBuf,
    pub timeout_secs: u64,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            command: None,
            tests_dir: PathBuf::from("tests"),
            timeout_secs: 60,
            timeout_policy: TimeoutPolicy::FailOpen,
        }
    }
}

// ── Performer ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformerConfig {
    /// File that add-dependency appends package names to.
    pub dependency_manifest: PathBuf,
    /// Create a stub when modify-core-logic targets a missing file.
    pub create_missing_core: bool,
}

impl Default for PerformerConfig {
    fn default() -> Self {
        Self {
            dependency_manifest: PathBuf::from("requirements.txt"),
            create_missing_core: true,
        }
    }
}

// ── Observer ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Directories watched in continuous mode.
    pub paths: Vec<PathBuf>,
    /// Events for the same path within this window are dropped.
    pub debounce_ms: u64,
    /// How often the pending queue length is reported.
    pub queue_report_secs: u64,
    /// Path fragments that are never turned into operations.
    pub ignore: Vec<String>,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            paths: vec!["src".into(), "tests".into(), "docs".into()],
            debounce_ms: 2_000,
            queue_report_secs: 10,
            ignore: vec![
                ".git".into(),
                ".rein".into(),
                ".logs".into(),
                "__pycache__".into(),
                ".pyc".into(),
                ".swp".into(),
                "target/".into(),
            ],
        }
    }
}

// ── Persistence ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Root of trust, audit and decision state, relative to the project root.
    pub state_dir: PathBuf,
    /// Keep the review queue across restarts.
    pub persist_queue: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".rein"),
            persist_queue: false,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl Default for ReinConfig {
    fn default() -> Self {
        Self {
            autonomy: AutonomyConfig::default(),
            operations: default_operations(),
            path_rules: default_path_rules(),
            batching: BatchingConfig::default(),
            checkpoint: CheckpointConfig::default(),
            verification: VerificationConfig::default(),
            performer: PerformerConfig::default(),
            observer: ObserverConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A configuration warning with severity and optional fix hint.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Info => "💡",
            WarningSeverity::Warning => "⚠️ ",
            WarningSeverity::Error => "❌",
        };
        write!(f, "{icon} {}: {}", self.field, self.message)?;
        if let Some(ref hint) = self.hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}

impl ReinConfig {
    /// Validate the configuration. Returns warnings, or an error listing every
    /// error-severity problem.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Thresholds ───
        for (field, value) in [
            ("autonomy.auto_threshold", self.autonomy.auto_threshold),
            ("autonomy.notify_threshold", self.autonomy.notify_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                warnings.push(ConfigWarning {
                    field: field.into(),
                    message: format!("{value} is outside 0.0-1.0"),
                    severity: WarningSeverity::Error,
                    hint: Some("Success rates are fractions, e.g. 0.95".into()),
                });
            }
        }
        if self.autonomy.auto_threshold < self.autonomy.notify_threshold {
            warnings.push(ConfigWarning {
                field: "autonomy.auto_threshold".into(),
                message: format!(
                    "auto_threshold {} is below notify_threshold {}",
                    self.autonomy.auto_threshold, self.autonomy.notify_threshold
                ),
                severity: WarningSeverity::Error,
                hint: Some("auto_threshold must be >= notify_threshold".into()),
            });
        }
        if self.autonomy.trust_window == 0 {
            warnings.push(ConfigWarning {
                field: "autonomy.trust_window".into(),
                message: "trust window is zero — no outcome would ever be kept".into(),
                severity: WarningSeverity::Error,
                hint: Some("The usual window is 20".into()),
            });
        } else if self.autonomy.trust_window < 5 {
            warnings.push(ConfigWarning {
                field: "autonomy.trust_window".into(),
                message: format!(
                    "window of {} outcomes — a single success can promote a type",
                    self.autonomy.trust_window
                ),
                severity: WarningSeverity::Warning,
                hint: Some("Consider 20".into()),
            });
        }

        // ── Path rules ───
        for (i, rule) in self.path_rules.iter().enumerate() {
            if rule.pattern.trim().is_empty() {
                warnings.push(ConfigWarning {
                    field: format!("path_rules[{i}].pattern"),
                    message: "empty pattern".into(),
                    severity: WarningSeverity::Error,
                    hint: Some("Use a glob such as 'src/core/**'".into()),
                });
            } else if rule.override_level.is_none() {
                warnings.push(ConfigWarning {
                    field: format!("path_rules[{i}]"),
                    message: format!("rule '{}' has no override_level and never applies", rule.pattern),
                    severity: WarningSeverity::Info,
                    hint: None,
                });
            }
        }

        // ── Batching ───
        if self.batching.max_queue_size == 0 {
            warnings.push(ConfigWarning {
                field: "batching.max_queue_size".into(),
                message: "queue size is zero".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 5".into()),
            });
        }
        if self.batching.priority_keywords.iter().any(|k| k.trim().is_empty()) {
            warnings.push(ConfigWarning {
                field: "batching.priority_keywords".into(),
                message: "an empty keyword matches every operation".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Remove the empty entry".into()),
            });
        }

        // ── Operations ───
        for (tag, rule) in &self.operations {
            if !OperationKind::parse(tag).is_known() {
                warnings.push(ConfigWarning {
                    field: format!("operations.{tag}"),
                    message: "custom operation type".into(),
                    severity: WarningSeverity::Info,
                    hint: None,
                });
            }
            if !rule.choices.is_empty() && !rule.choices.iter().any(|c| c.approved) {
                warnings.push(ConfigWarning {
                    field: format!("operations.{tag}.choices"),
                    message: "no choice approves the operation".into(),
                    severity: WarningSeverity::Warning,
                    hint: Some("Manual prompts for this type can only reject".into()),
                });
            }
        }
        let needs_tests = self.operations.values().any(|r| r.test_required);
        if needs_tests && self.verification.command.is_none() {
            warnings.push(ConfigWarning {
                field: "verification.command".into(),
                message: "operations require tests but no verification command is set".into(),
                severity: WarningSeverity::Info,
                hint: Some("e.g. command = \"cargo test --quiet\"".into()),
            });
        }
        if self.verification.timeout_policy == TimeoutPolicy::FailOpen {
            warnings.push(ConfigWarning {
                field: "verification.timeout_policy".into(),
                message: "verification timeouts count as success".into(),
                severity: WarningSeverity::Info,
                hint: Some("Use 'fail-closed' to treat timeouts as failures".into()),
            });
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        // Check for hard errors
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
