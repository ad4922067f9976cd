//! Warranty Core - Foundation crate for the warranty coverage checker.
//!
//! This crate provides the shared types, error handling, configuration
//! management and output seam that every other crate in the workspace
//! depends on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`Identifier`, `SessionToken`, `LookupStatus`, `ResultRecord`)
//! - [`sink`] - The `RecordSink` trait result records are appended through
//!
//! # Example
//!
//! ```rust
//! use warranty_core::{AppConfig, Identifier, LookupStatus, ResultRecord};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.retry.invalid_captcha_limit, 6);
//!
//! let serial = Identifier::new("XX1234567890")?;
//! let record = ResultRecord::unavailable(serial, LookupStatus::Invalid);
//! assert_eq!(record.status.to_string(), "Invalid");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod sink;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, EndpointConfig, OcrConfig, RetryConfig, MAX_JITTER_FACTOR};
pub use error::{ConfigError, ConfigResult, CoverageError, Result};
pub use sink::{MemorySink, RecordSink};
pub use types::{
    Identifier, LookupStatus, ResultRecord, SessionToken, NOT_AVAILABLE, NOT_FOUND,
    OUTPUT_HEADERS,
};
