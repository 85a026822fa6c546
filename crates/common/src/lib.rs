//! Reelcut Common Utilities
//!
//! Shared infrastructure for all Reelcut crates:
//! - Error types and result aliases
//! - Frame-rate validation and time-base conversion
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod timebase;

pub use config::*;
pub use error::*;
pub use timebase::*;
