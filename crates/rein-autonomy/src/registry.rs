use rein_config::ReinConfig;
use rein_core::{Choice, DecisionMode, OperationKind, normalize_tag};
use std::sync::Arc;

/// Everything the loop needs to know about one operation type.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationProfile {
    pub kind: OperationKind,
    /// Level before path overrides and trust escalation.
    pub base_level: DecisionMode,
    pub test_required: bool,
    /// Single-choice options offered on a manual prompt.
    pub choices: Vec<Choice>,
    /// Whether the rules file names this type.
    pub configured: bool,
}

/// Maps operation kinds to their profile, layering configured rules over the
/// built-in choice sets.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    config: Arc<ReinConfig>,
}

impl OperationRegistry {
    pub fn new(config: Arc<ReinConfig>) -> Self {
        Self { config }
    }

    /// Profile for `kind`. Types without a rule run at `review` with no
    /// verification.
    pub fn profile(&self, kind: &OperationKind) -> OperationProfile {
        match self.config.operation_rule(kind) {
            Some(rule) => OperationProfile {
                kind: kind.clone(),
                base_level: rule.autonomy_level,
                test_required: rule.test_required,
                choices: if rule.choices.is_empty() {
                    default_choices(kind)
                } else {
                    rule.choices.clone()
                },
                configured: true,
            },
            None => OperationProfile {
                kind: kind.clone(),
                base_level: DecisionMode::Review,
                test_required: false,
                choices: default_choices(kind),
                configured: false,
            },
        }
    }

    /// Built-in kinds followed by any custom kinds the rules file declares.
    pub fn kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<OperationKind> = OperationKind::KNOWN.to_vec();
        for tag in self.config.operations.keys() {
            let kind = OperationKind::parse(&normalize_tag(tag));
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    pub fn profiles(&self) -> Vec<OperationProfile> {
        self.kinds().iter().map(|k| self.profile(k)).collect()
    }
}

/// Built-in manual-approval options per type.
pub fn default_choices(kind: &OperationKind) -> Vec<Choice> {
    match kind {
        OperationKind::AddDependency => vec![
            Choice::approve("Approve", "Add this dependency and run a security scan"),
            Choice::decline(
                "Reject",
                "Do not add it; an alternative is needed",
                "dependency_rejected",
            ),
            Choice::decline("Defer", "Record it as technical debt", "deferred"),
        ],
        OperationKind::ModifyCoreLogic => vec![
            Choice::approve("Approve", "Allow the core logic change"),
            Choice::decline(
                "Approve after refactor",
                "The surrounding code must be refactored first",
                "needs_refactor",
            ),
            Choice::decline("Reject", "The proposed change is not acceptable", "rejected"),
        ],
        _ => vec![
            Choice::approve("Approve", "Go ahead with this operation"),
            Choice::decline("Approve after change", "The approach needs adjusting", "needs_change"),
            Choice::decline("Reject", "Do not perform this operation", "rejected"),
        ],
    }
}
