//! Shared types used across the warranty coverage checker.
//!
//! This module defines the newtypes and enums that flow between the lookup
//! pipeline and its input/output collaborators.

use crate::error::CoverageError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for fields the service never reports for a classification.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sentinel for fields the service reports but that could not be extracted.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Header row of the output sheet, in column order.
pub const OUTPUT_HEADERS: [&str; 5] = [
    "Serial Number",
    "Product Name",
    "Purchase Date",
    "Coverage Expiry",
    "Status",
];

/// Device identifier (serial number) supplied by the caller.
///
/// Opaque to the pipeline: surrounding whitespace is trimmed and the empty
/// string is rejected, nothing else is validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    /// Create a new `Identifier` from a string.
    ///
    /// # Errors
    /// Returns error if the value is empty after trimming.
    pub fn new(id: impl Into<String>) -> Result<Self, CoverageError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(CoverageError::Validation(
                "identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authentication token issued by the coverage service.
///
/// Scoped to one outbound session. `Debug` is redacted so the token never
/// ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token value for use in a request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Terminal status written to the `Status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupStatus {
    /// The service rejected the serial number as invalid
    Invalid,
    /// The device exists but its purchase date is unverified
    CannotVerifyPurchaseDate,
    /// Coverage benefits listed, or coverage expired
    FullyValid,
    /// The service refused to process the request
    CannotProcess,
    /// Detailed coverage payload returned
    Valid,
    /// No known marker matched the response
    Unknown,
    /// The per-identifier token refresh cap was hit
    RetriesExhausted,
}

impl LookupStatus {
    /// String written to the output sheet.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::CannotVerifyPurchaseDate => "Cannot verify purchase date",
            Self::FullyValid => "Fully valid",
            Self::CannotProcess => "Cannot process request",
            Self::Valid => "VALID",
            Self::Unknown => "Unknown",
            Self::RetriesExhausted => "Retries exhausted",
        }
    }
}

impl fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row: the result of looking up a single identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// The identifier that was looked up
    pub identifier: Identifier,
    /// Product name, or a sentinel
    pub product_name: String,
    /// Purchase month and year, or a sentinel
    pub purchase_date: String,
    /// Coverage expiry date, or a sentinel
    pub coverage_expiry: String,
    /// Terminal status
    pub status: LookupStatus,
}

impl ResultRecord {
    /// Record whose detail fields are all [`NOT_AVAILABLE`].
    #[must_use]
    pub fn unavailable(identifier: Identifier, status: LookupStatus) -> Self {
        Self {
            identifier,
            product_name: NOT_AVAILABLE.to_string(),
            purchase_date: NOT_AVAILABLE.to_string(),
            coverage_expiry: NOT_AVAILABLE.to_string(),
            status,
        }
    }

    /// Cells in [`OUTPUT_HEADERS`] order.
    #[must_use]
    pub fn to_row(&self) -> [String; 5] {
        [
            self.identifier.to_string(),
            self.product_name.clone(),
            self.purchase_date.clone(),
            self.coverage_expiry.clone(),
            self.status.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_trims() {
        let id = Identifier::new("  C02XK1ABJGH5 ").expect("valid identifier");
        assert_eq!(id.as_str(), "C02XK1ABJGH5");
        assert_eq!(id.to_string(), "C02XK1ABJGH5");
    }

    #[test]
    fn test_identifier_rejects_empty() {
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("   ").is_err());
    }

    #[test]
    fn test_session_token_debug_is_redacted() {
        let token = SessionToken::new("secret-token-value");
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(token.expose(), "secret-token-value");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(LookupStatus::Invalid.to_string(), "Invalid");
        assert_eq!(
            LookupStatus::CannotVerifyPurchaseDate.to_string(),
            "Cannot verify purchase date"
        );
        assert_eq!(LookupStatus::FullyValid.to_string(), "Fully valid");
        assert_eq!(
            LookupStatus::CannotProcess.to_string(),
            "Cannot process request"
        );
        assert_eq!(LookupStatus::Valid.to_string(), "VALID");
        assert_eq!(LookupStatus::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_unavailable_record_row() {
        let id = Identifier::new("XX1234567890").expect("valid identifier");
        let record = ResultRecord::unavailable(id, LookupStatus::Invalid);

        assert_eq!(
            record.to_row(),
            [
                "XX1234567890".to_string(),
                "N/A".to_string(),
                "N/A".to_string(),
                "N/A".to_string(),
                "Invalid".to_string(),
            ]
        );
    }

    #[test]
    fn test_record_serializes() {
        let id = Identifier::new("XX1234567890").expect("valid identifier");
        let record = ResultRecord::unavailable(id, LookupStatus::Unknown);
        let json = serde_json::to_string(&record).expect("serialize record");
        assert!(json.contains("XX1234567890"));
        assert!(json.contains("Unknown"));
    }
}
