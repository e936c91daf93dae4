//! Subcommands.

pub mod process;
pub mod processors;
