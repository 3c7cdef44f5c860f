// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # graphgate
//!
//! Uniform access to heterogeneous graph and relational data sources.
//!
//! ## Features
//!
//! - **Canonical graph model**: every backend returns the same node/edge shape
//!   with composite ids, edge counts and per-class property types
//! - **Capability traits**: graph query, bulk indexing, metadata, tabular query
//! - **Plugin registry**: backends discovered from manifests, resolved by
//!   data source type tag
//! - **SSH tunnels**: remote data sources reached through a gateway, one
//!   session per call, always closed
//! - **Sprites**: multi-valued records pushed through pluggable players
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graphgate::config::load_data_source;
//! use graphgate::registry::{PluginCatalog, Providers};
//! use graphgate::tunnel::{SshConfig, Tunnel};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> graphgate::Result<()> {
//!     let tunnel = Arc::new(Tunnel::openssh(SshConfig::from_env()?));
//!     let providers = Providers::new(&PluginCatalog::builtin()?, tunnel);
//!
//!     let ds = load_data_source("datasources/sales.yaml")?;
//!     let table = providers
//!         .table(&ds)?
//!         .fetch_data(&ds, "SELECT * FROM orders", &[], 100)
//!         .await?;
//!     println!("{} rows", table.rows.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Providers (registry)                     │
//! │   graph(ds)      index(ds)      metadata(ds)      table(ds)     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │ remote?
//!                        ┌───────┴────────┐
//!                        │ Tunneled<P>    │  ssh -L 127.0.0.1:port
//!                        └───────┬────────┘
//! ┌──────────────┬───────────────┴──────────┬──────────────────────┐
//! │   memory     │        relational        │   your plugins       │
//! ├──────────────┼──────────────────────────┼──────────────────────┤
//! │ GraphData    │ TableData (DuckDB)       │ manifest + factory   │
//! │ Sprites      │ Sprites, metadata        │                      │
//! └──────────────┴──────────────────────────┴──────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Canonical graph model and id scheme
pub mod model;

/// Sprites and sprite players
pub mod sprite;

/// Backend capability traits
pub mod provider;

/// SSH tunnel transport
pub mod tunnel;

/// Plugin discovery and provider registries
pub mod registry;

/// Reference backends
pub mod backends;

/// Data source descriptor files
pub mod config;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

pub use model::{DataSourceInfo, GraphData, TableData, Value};
pub use provider::{GraphDataProvider, IndexProvider, MetadataProvider, TableDataProvider};
pub use registry::Providers;
pub use sprite::{Sprite, SpritePlayer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
