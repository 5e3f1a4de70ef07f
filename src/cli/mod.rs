//! CLI subcommand implementations for the forager binary.

pub mod output;
pub mod probe_cmd;
pub mod run_cmd;
