//! # rein-runtime
//!
//! The feedback loop around a single operation, plus the two ways work
//! arrives from outside: file changes and editor hooks.
//!
//! ## Architecture
//!
//! ```text
//!    ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//!    │ CLI execute  │   │   Observer   │   │    Hooks    │
//!    └──────┬───────┘   └──────┬───────┘   └──────┬──────┘
//!           │                  │ mpsc             │ pre/post
//!           ▼                  ▼                  ▼
//!    ┌─────────────────────────────────────────────────┐
//!    │                     Engine                      │
//!    │  classify ─► checkpoint ─► perform ─► verify    │
//!    │     │            ▲                      │       │
//!    │     ▼            └──── rollback ◄───────┤       │
//!    │  queue / prompt            trust ◄──────┘       │
//!    └─────────────────────────────────────────────────┘
//! ```

pub mod checkpoint;
pub mod hooks;
pub mod observer;
pub mod perform;
pub mod pipeline;
pub mod verify;

pub use checkpoint::{Checkpoint, CheckpointManager, GitStash, LABEL_PREFIX, SnapshotStore};
pub use hooks::{PostCheckResponse, PreCheckResponse, PromptContext, ToolEvent};
pub use observer::ChangeObserver;
pub use perform::{Performer, WorkspacePerformer};
pub use pipeline::{BatchOutcome, Engine, EngineBuilder};
pub use verify::{CommandVerifier, VerificationReport, VerificationRunner, VerificationStatus};
