//! CLI module
//!
//! Command-line interface over the provider registry.
//!
//! # Commands
//!
//! - `providers` - List registered data source types per capability
//! - `check` - Test the connection to a data source
//! - `metadata` - Show classes and properties
//! - `query` - Run a tabular query
//! - `graph` / `expand` / `load` - Graph queries
//! - `index` - Stream records as JSON lines

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{parse_param, Runner};
