//! Adapter implementations (hexagonal architecture)
//!
//! Adapters implement the port traits with concrete technology.

pub mod duckdb;
