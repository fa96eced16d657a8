//! CLI module for CliniQ
//!
//! Handles command-line argument parsing and configuration management.

pub mod args;
pub mod config;
pub mod display;

pub use args::{parse_local_override, resolve_case, Args, Commands, Verbosity, EXAMPLE_CASES};
pub use config::Config;
