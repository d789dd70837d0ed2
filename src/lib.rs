//! # Media Organizer
//!
//! Finds duplicate media files and plans a deterministic, collision-free
//! folder layout by date and location.
//!
//! ## Core Philosophy
//! - **Simulate by default** - nothing moves until a run is explicitly applied
//! - **Never overwrite** - every destination is checked twice, at plan and at apply time
//! - **Never abort on one file** - failures are collected and summarised
//!
//! ## Architecture
//! - `core` - scanning, classification, planning and execution
//! - `events` - progress reporting over channels
//! - `error` - error types
//! - `config` - optional TOML configuration

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{OrganizerError, Result};

/// Initialize tracing for the library
///
/// Called once by the binary. `RUST_LOG` wins over `verbose` when set.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
