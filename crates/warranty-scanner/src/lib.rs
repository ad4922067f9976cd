//! Warranty Scanner - Captcha-gated coverage lookup orchestration.
//!
//! This crate drives serial numbers through the coverage service one at a
//! time: acquire a session token, fetch and OCR a captcha, submit the lookup
//! and classify the response. Rate limits, rejected captchas and flaky
//! transport are retried with jittered exponential backoff so that each
//! identifier ends in exactly one result record.
//!
//! # Features
//!
//! - Strictly sequential processing in input order
//! - Token refresh after repeated captcha failures
//! - Escalating backoff while the service reports it is busy
//! - Ordered marker table for response classification
//!
//! # Example
//!
//! ```rust,ignore
//! use warranty_scanner::LookupOrchestrator;
//! use std::sync::Arc;
//!
//! let orchestrator = LookupOrchestrator::new(
//!     Arc::new(http_api),
//!     Arc::new(tesseract),
//!     &config.retry,
//! );
//!
//! let summary = orchestrator.run_batch(&identifiers, &mut writer).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod backoff;
pub mod captcha;
#[allow(missing_docs)]
pub mod error;
pub mod orchestrator;
pub mod query;
pub mod token;

pub use backoff::BackoffScheduler;
pub use captcha::{
    decode_challenge, AttemptOutcome, CaptchaChallenge, CaptchaSolution, CaptchaSolver,
    RetryReason, SolveOutcome, CAPTCHA_BUSY_MARKER,
};
pub use error::{LookupError, Result};
pub use orchestrator::{BatchSummary, LookupContext, LookupOrchestrator};
pub use query::{
    classify, CoverageDetails, CoverageKind, CoverageQueryEngine, Marker, QueryOutcome, MARKERS,
};
pub use token::SessionTokenClient;
