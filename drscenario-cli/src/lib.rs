//! drscenario CLI library: argument parsing, command handlers and the
//! scenario orchestrator, split from `main.rs` so integration tests can drive
//! a scenario against an in-memory cluster.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod scenario;
