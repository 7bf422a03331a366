//! Unit tests for flotilla CLI
//!
//! These tests drive the public services with in-memory providers, shells
//! and stores. No processes are spawned and time is paused.

mod architecture;
mod property_tests;
