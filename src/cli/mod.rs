//! Command-line interface for agentforge.
//!
//! Provides commands to serve the event stream, run the pipeline once, and
//! run the refinement loop.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
