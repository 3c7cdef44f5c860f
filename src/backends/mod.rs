//! Reference backends
//!
//! - [`memory`] - in-memory property graphs (graph query, indexing, metadata)
//! - [`relational`] - DuckDB, SQLite, PostgreSQL and MySQL through DuckDB
//!   (tabular query, indexing, metadata)

pub mod memory;
pub mod relational;

pub use memory::{MemoryEdge, MemoryGraph, MemoryGraphProvider, MemoryVertex};
pub use relational::RelationalProvider;

#[cfg(test)]
mod tests;
