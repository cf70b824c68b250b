//! # Lazywire Support
//!
//! Shared helpers for the lazywire crates.
//!
//! This crate provides:
//! - Text rendering for dependency chains, graphs and type names
//! - A one-call `tracing` subscriber installer for binaries and tests

pub mod rendering;
pub mod logging;
