//! CLI command implementations for herakles-nic-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Device discovery and counter coverage report
//! - `config`: Configuration file generation
//! - `test`: Update cycle testing
//! - `schema`: Metric schema listing
//! - `generate`: Synthetic device tree generation

pub mod check;
pub mod config;
pub mod generate;
pub mod schema;
pub mod test;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use generate::command_generate_testdata;
pub use schema::command_schema;
pub use test::command_test;
