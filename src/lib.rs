//! Omen workspace-level test utilities.
//!
//! This crate exists solely to host the workspace integration tests in
//! `tests/pipeline.rs`.
//!
//! The actual omen functionality is in the workspace member crates:
//! - `omen-types`: Shared types and JSON schemas
//! - `omen-store`: Expectation parsing and matching
//! - `omen-history`: History annotation of outcomes
//! - `omen-adapters`: Process adapter for external bug trackers
//! - `omen-app`: Application use cases
//! - `omen` (omen-cli): CLI interface
