//! # rein-cli
//!
//! Command-line interface for the rein autonomy loop.
//!
//! ## Commands
//!
//! - `rein execute` — Run one operation through the pipeline
//! - `rein check` — Show thresholds and per-type rules
//! - `rein trust` — Show per-type success rates
//! - `rein queue` / `rein approve` — Inspect and decide queued operations
//! - `rein audit` — Summarize recent executions
//! - `rein watch` — React to file changes continuously
//! - `rein hook` — Editor hook protocol (pre/post/prompt)
//! - `rein rollback` — Restore a checkpoint by label
//! - `rein doctor` — Audit the configuration

pub mod commands;
pub mod responder;

pub use commands::Cli;
pub use responder::TerminalResponder;
