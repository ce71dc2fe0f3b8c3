//! CLI subcommand implementations for the `loadkit` binary.

pub mod load_cmd;
pub mod manifest_cmd;
pub mod output;
