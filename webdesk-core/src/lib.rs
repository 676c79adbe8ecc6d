//! Webdesk Core - shared configuration, error, and logging infrastructure
//!
//! This crate defines the infrastructure types used by the rest of the webdesk server

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
