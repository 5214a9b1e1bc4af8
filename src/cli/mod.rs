//! Command-line interface for tale-publish.
//!
//! Provides the `publish` and `classify` commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
