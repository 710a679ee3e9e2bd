//! # rein-config
//!
//! Rule configuration for the Rein autonomy loop. Reads from `rein.toml` (or a
//! legacy `rules.json`) and environment variables, in that precedence order.
//!
//! The configuration is loaded once at startup and is read-only afterwards.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::ReinConfig;
pub use schema::{
    AutonomyConfig, BatchingConfig, CheckpointConfig, ConfigWarning, LoggingConfig,
    ObserverConfig, OperationRule, PathRule, PerformerConfig, PersistenceConfig, TimeoutPolicy,
    VerificationConfig, WarningSeverity,
};
