//! # rein-autonomy
//!
//! Decides how much autonomy an operation gets. Combines the static rules
//! (per-type base level, ordered path overrides) with the observed success
//! rate of past executions, and buffers operations that need a human into a
//! batched decision queue.

pub mod approval;
pub mod classifier;
pub mod glob;
pub mod queue;
pub mod registry;
pub mod trust;

pub use approval::{BatchChoice, Responder, ScriptedResponder};
pub use classifier::{AutonomyClassifier, Classification};
pub use glob::PathPattern;
pub use queue::{DecisionQueue, QueueContext, QueueEntry, TriggerReason};
pub use registry::{OperationProfile, OperationRegistry};
pub use trust::{TrustStats, TrustTracker};
