//! # rein-core
//!
//! Core types, events, and primitives for the Rein autonomy loop.
//! This crate defines the shared vocabulary used by every other crate in the workspace.

pub mod error;
pub mod event;
pub mod types;

pub use error::{ReinError, Result};
pub use event::{Event, EventBus};
pub use types::*;
