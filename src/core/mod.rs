//! core
//!
//! Domain types, configuration, and the provenance trailer protocol.

pub mod config;
pub mod trailers;
pub mod types;
