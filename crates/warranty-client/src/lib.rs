//! Warranty Client - Transport and recognition backends for coverage lookups.
//!
//! This crate owns everything that talks to the outside world on behalf of
//! the lookup pipeline: the coverage service's three HTTP endpoints and the
//! OCR engine used to read captcha images. Both sit behind async traits so the
//! pipeline can be driven by scripted fakes in tests.
//!
//! # Architecture
//!
//! - **Transport** ([`api`]): `CoverageApi` trait plus the reqwest-backed `HttpCoverageApi`
//! - **User agents** ([`user_agent`]): browser identification strings for outbound requests
//! - **OCR** ([`ocr`]): `OcrBackend` trait plus the tesseract-backed `TesseractOcr`
//! - **Errors** ([`error`]): client-specific error types
//!
//! # Example
//!
//! ```rust,no_run
//! use warranty_client::{CoverageApi, HttpCoverageApi};
//! use warranty_core::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let api = HttpCoverageApi::new(&config.endpoint)?;
//!
//! match api.request_token().await? {
//!     Some(_token) => println!("session established"),
//!     None => println!("token issuance is rate limited"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod api;
pub mod error;
pub mod ocr;
pub mod user_agent;

// Re-export commonly used types
pub use api::{build_http_client, CoverageApi, CoverageRequest, HttpCoverageApi};
pub use error::{ClientError, Result};
pub use ocr::{parse_tsv, OcrBackend, OcrCandidate, TesseractOcr};
pub use user_agent::UserAgentProvider;
