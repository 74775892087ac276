//! Command-line interface for agent-bench.
//!
//! Provides the `run` and `summarize` subcommands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
