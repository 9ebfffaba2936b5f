//! Command-line interface
//!
//! Argument parsing lives in [`args`]; each subcommand handler lives in
//! [`commands`].

pub mod args;
pub mod commands;
