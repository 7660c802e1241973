//! Command-line interface
//!
//! Argument parsing for the `golos-call` binary.

pub mod commands;

pub use commands::{Command, JsonArg, Opt};
