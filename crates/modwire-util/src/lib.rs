//! Shared utilities for the modwire module resolver.
//!
//! This crate provides the cross-cutting error type used by all other
//! modwire crates.

pub mod errors;
