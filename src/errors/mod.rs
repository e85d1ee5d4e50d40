//! Centralized error handling for the harvester
//!
//! Only a small part of what can go wrong during a run is allowed to stop it.
//! Malformed input lines, unreachable sources and failing probes are contained
//! by the stage that sees them and surface as diagnostics or counters. The
//! types here cover the rest.
//!
//! # Error Categories
//!
//! - **Source Errors**: a local file or remote subscription could not be read
//! - **Configuration Errors**: out-of-range or unparsable settings
//! - **Pipeline Errors**: unexpected failures that abort the run
//!
//! # Usage
//!
//! ```rust
//! use m3u_harvest::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
