//! Configuration
//!
//! YAML schema for the signal controller and its driver, plus the loader
//! that reads, parses, and validates it.

pub mod loader;
pub mod schema;

pub use loader::{LoadResult, LoadWarning, load};
pub use schema::{CycleConfig, SignalConfig, parse_duration};
