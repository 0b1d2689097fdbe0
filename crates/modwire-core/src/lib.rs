//! Core data types for the modwire module resolver.
//!
//! This crate defines what the resolver consumes: versions and version
//! ranges, tagged matching attributes, module descriptors with their
//! export/import/require/fragment-host clauses, and resolver configuration.
//!
//! This crate is intentionally free of resolution logic.

pub mod attribute;
pub mod config;
pub mod descriptor;
pub mod version;
