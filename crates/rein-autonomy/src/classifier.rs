use rein_config::ReinConfig;
use rein_core::{DecisionMode, Operation};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::glob::PathPattern;
use crate::registry::OperationRegistry;
use crate::trust::TrustTracker;

/// How a decision mode was reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub mode: DecisionMode,
    /// Level from the type's rule (review for unknown types).
    pub base_level: DecisionMode,
    /// Pattern of the path rule that replaced the base level, if any.
    pub path_override: Option<String>,
    pub success_rate: Option<f64>,
    /// Trust raised or lowered the level.
    pub escalated: bool,
}

impl Classification {
    pub fn reason(&self) -> String {
        let mut reason = format!("base level {}", self.base_level);
        if let Some(pattern) = &self.path_override {
            reason.push_str(&format!(", path rule '{pattern}'"));
        }
        match self.success_rate {
            Some(rate) if self.escalated => {
                reason.push_str(&format!(", trust {:.1}% -> {}", rate * 100.0, self.mode));
            }
            Some(rate) => reason.push_str(&format!(", trust {:.1}%", rate * 100.0)),
            None => reason.push_str(", no history"),
        }
        reason
    }
}

/// Maps an operation plus observed trust onto one of the four decision modes.
pub struct AutonomyClassifier {
    config: Arc<ReinConfig>,
    registry: OperationRegistry,
    path_rules: Vec<(PathPattern, Option<DecisionMode>)>,
}

impl AutonomyClassifier {
    pub fn new(config: Arc<ReinConfig>) -> Self {
        let path_rules = config
            .path_rules
            .iter()
            .filter_map(|rule| match PathPattern::new(rule.pattern.as_str()) {
                Ok(pattern) => Some((pattern, rule.override_level)),
                Err(e) => {
                    warn!(pattern = %rule.pattern, error = %e, "ignoring unusable path rule");
                    None
                }
            })
            .collect();
        Self {
            registry: OperationRegistry::new(Arc::clone(&config)),
            config,
            path_rules,
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn classify(&self, operation: &Operation, trust: &TrustTracker) -> DecisionMode {
        self.explain(operation, trust).mode
    }

    pub fn explain(&self, operation: &Operation, trust: &TrustTracker) -> Classification {
        let classification =
            self.classify_with_rate(operation, trust.success_rate(&operation.kind));
        debug!(
            op = %operation.kind,
            mode = %classification.mode,
            reason = %classification.reason(),
            "classified operation"
        );
        classification
    }

    /// Pure classification given a success rate.
    ///
    /// A manual level set by a path rule is final. Otherwise a rate at or above
    /// `auto_threshold` yields auto, one at or above `notify_threshold` yields
    /// notify, and anything lower keeps the rule level.
    pub fn classify_with_rate(
        &self,
        operation: &Operation,
        success_rate: Option<f64>,
    ) -> Classification {
        let base_level = self.registry.profile(&operation.kind).base_level;
        let mut level = base_level;
        let mut path_override = None;

        if let Some(target) = &operation.target_path {
            if let Some((pattern, override_level)) = self
                .path_rules
                .iter()
                .find_map(|(pattern, lvl)| match lvl {
                    Some(l) if pattern.matches(target) => Some((pattern, *l)),
                    _ => None,
                })
            {
                level = override_level;
                path_override = Some(pattern.pattern().to_string());
            }
        }

        let locked = path_override.is_some() && level == DecisionMode::Manual;
        let thresholds = &self.config.autonomy;
        let trusted = match success_rate {
            Some(_) if locked => None,
            Some(rate) if rate >= thresholds.auto_threshold => Some(DecisionMode::Auto),
            Some(rate) if rate >= thresholds.notify_threshold => Some(DecisionMode::Notify),
            _ => None,
        };

        Classification {
            mode: trusted.unwrap_or(level),
            base_level,
            path_override,
            success_rate,
            escalated: trusted.is_some_and(|m| m != level),
        }
    }
}
