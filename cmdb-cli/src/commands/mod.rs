//! Command implementations for the cmdb CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod actions;
pub mod completions;
pub mod config;
pub mod interactive;
pub mod search;
