//! Integration tests for flotilla CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! None of them reach a provider: they cover argument parsing, the config
//! file and the paths that finish before connecting.

mod cli_tests;
mod config_command;
mod context_commands;
