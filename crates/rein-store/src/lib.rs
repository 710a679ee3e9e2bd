//! # rein-store
//!
//! Durable state for the rein decision loop, laid out under a single state
//! directory (default `.rein/`):
//!
//! - **Trust history**: rolling outcome samples per operation type (`trust/scores.json`).
//! - **Audit log**: append-only, one JSON line per execution, partitioned by day.
//! - **Decision log**: append-only human decisions partitioned by month, plus an
//!   approval tally per operation type.
//!
//! Every reader degrades to an empty/default value when a file is missing or
//! corrupt; writers report errors and leave recovery to the caller.

pub mod audit;
pub mod decisions;
pub mod document;
pub mod jsonl;
pub mod layout;
pub mod trust;

pub use audit::{AuditLog, AuditSummary};
pub use decisions::DecisionLog;
pub use document::JsonDocument;
pub use layout::StateLayout;
pub use trust::{TrustDocument, TrustSample, TrustStore};
