//! # mschema-cli: Command-Line Front End
//!
//! Thin wrapper over the `mschema` engine for use in scripts and CI.
//!
//! ## Subcommands
//!
//! - `check`: match a YAML or JSON document against a schema file
//! - `compile`: compile a schema file and report schema errors
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers return an exit code.
//! - Handlers delegate matching to the engine crate.

pub mod check;
pub mod compile;
pub mod config;
pub mod document;
