//! Sequential batch orchestration of AI agent tasks over a set of files.
//!
//! A run resolves an agent, selects files, resolves one task intent and then
//! walks the files in order: lifecycle hooks fire around every file, the
//! agent is driven through submit / confirm / poll, and each step is appended
//! to a per-run log. The final statistics are published to the dashboard
//! registry.
//!
//! - [`state`]: run statistics and the batch state machine.
//! - [`hook`]: hook definitions, the condition grammar and the hook runner.
//! - [`agent`]: the agent handle seam and the per-file task driver.
//! - [`select`]: file selection, task intent and modified-file probes.
//! - [`runner`]: the orchestrator, the run log, notifications, dashboard.

pub mod agent;
pub mod config;
pub mod error;
pub mod hook;
pub mod runner;
pub mod select;
pub mod state;
