//! qrsplice Common Utilities
//!
//! Shared infrastructure for all qrsplice crates:
//! - Error types and result aliases
//! - Pipeline stage identifiers
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod stage;

pub use config::*;
pub use error::*;
pub use stage::*;
