//! Coverage lookup submission and response classification.
//!
//! The coverage endpoint answers with human-readable copy, not a typed
//! contract, so outcomes are recognised by marker substrings. The markers
//! live in one ordered table ([`MARKERS`]) because a body can contain more
//! than one of them and the first match must win. When the vendor changes
//! its wording, this table is what needs updating.

use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;
use warranty_client::{ClientError, CoverageApi, CoverageRequest};
use warranty_core::{Identifier, LookupStatus, ResultRecord, SessionToken, NOT_FOUND};

use crate::captcha::CaptchaSolution;

/// Classification a marker maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Service busy
    RateLimited,
    /// Captcha answer rejected
    CaptchaMismatch,
    /// Serial number rejected
    InvalidIdentifier,
    /// Purchase date cannot be verified
    PurchaseDateUnverifiable,
    /// Coverage benefits are listed
    BenefitsListed,
    /// Coverage has expired
    CoverageExpired,
    /// Request refused outright
    CannotProcess,
    /// Detailed coverage payload
    CoverageDetail,
}

/// Marker substrings in priority order; the first one found in a body wins.
pub const MARKERS: &[(&str, Marker)] = &[
    ("process your request.", Marker::RateLimited),
    ("The code you entered does not match", Marker::CaptchaMismatch),
    ("Please enter a valid serial number.", Marker::InvalidIdentifier),
    ("Sign in to update purchase date", Marker::PurchaseDateUnverifiable),
    ("Your coverage includes the following benefits", Marker::BenefitsListed),
    ("Coverage Expired", Marker::CoverageExpired),
    ("We cannot process your request at this time.", Marker::CannotProcess),
    ("Apple coverage for your product", Marker::CoverageDetail),
];

/// First marker found in `body`, if any.
#[must_use]
pub fn classify(body: &str) -> Option<Marker> {
    MARKERS
        .iter()
        .find(|(needle, _)| body.contains(needle))
        .map(|(_, marker)| *marker)
}

/// Which kind of coverage response was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageKind {
    /// Benefits listed
    BenefitsListed,
    /// Coverage expired
    Expired,
    /// Detailed coverage payload
    Detailed,
}

/// Fields pulled out of a coverage response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageDetails {
    /// Product name, e.g. `MacBook Pro (13-inch, M1, 2020)`
    pub product_name: Option<String>,
    /// Serial number echoed back by the service
    pub serial_echo: Option<String>,
    /// Purchase month and year
    pub purchase_date: Option<String>,
    /// Coverage expiry date
    pub coverage_expiry: Option<String>,
}

fn product_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?:MacBook|iMac|Mac mini|Mac Studio|Mac Pro|iPhone|iPad|Apple Watch|AirPods)[^"()<>\n]*(?:\([^)"<>\n]*\))?"#,
        )
        .expect("valid regex")
    })
}

fn serial_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{1,2}\d{10}\b").expect("valid regex"))
}

fn labelled_purchase_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)purchase(?:d| date)?[\s:"]*((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{4})"#,
        )
        .expect("valid regex")
    })
}

fn month_year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{4}\b",
        )
        .expect("valid regex")
    })
}

fn expiry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Expires on\s*:\s*"?([^"<\n]+)"#).expect("valid regex"))
}

impl CoverageDetails {
    /// Extract whatever fields `body` contains.
    #[must_use]
    pub fn extract(body: &str) -> Self {
        let purchase_date = labelled_purchase_regex()
            .captures(body)
            .and_then(|c| c.get(1))
            .or_else(|| month_year_regex().find(body))
            .map(|m| m.as_str().trim().to_string());

        Self {
            product_name: product_regex()
                .find(body)
                .map(|m| m.as_str().trim().to_string()),
            serial_echo: serial_regex().find(body).map(|m| m.as_str().to_string()),
            purchase_date,
            coverage_expiry: expiry_regex()
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

/// Semantic outcome of a coverage lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Service busy; back off and retry with a new challenge
    RateLimited,
    /// Captcha answer rejected
    CaptchaInvalid,
    /// Serial number rejected
    IdentifierInvalid,
    /// Purchase date cannot be verified
    PurchaseDateUnverifiable,
    /// Coverage information returned
    CoverageFound {
        /// Which response shape matched
        kind: CoverageKind,
        /// Extracted fields
        details: CoverageDetails,
    },
    /// Request refused outright
    RequestRejected,
    /// No marker matched
    Unknown {
        /// Raw response body, kept for diagnosis
        body: String,
    },
}

impl QueryOutcome {
    /// Classify a raw coverage response body.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let found = |kind| Self::CoverageFound {
            kind,
            details: CoverageDetails::extract(body),
        };

        match classify(body) {
            Some(Marker::RateLimited) => Self::RateLimited,
            Some(Marker::CaptchaMismatch) => Self::CaptchaInvalid,
            Some(Marker::InvalidIdentifier) => Self::IdentifierInvalid,
            Some(Marker::PurchaseDateUnverifiable) => Self::PurchaseDateUnverifiable,
            Some(Marker::BenefitsListed) => found(CoverageKind::BenefitsListed),
            Some(Marker::CoverageExpired) => found(CoverageKind::Expired),
            Some(Marker::CannotProcess) => Self::RequestRejected,
            Some(Marker::CoverageDetail) => found(CoverageKind::Detailed),
            None => Self::Unknown {
                body: body.to_string(),
            },
        }
    }

    /// Whether this outcome ends the lookup for its identifier.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::RateLimited | Self::CaptchaInvalid)
    }

    /// The output record for a terminal outcome; `None` for retryable ones.
    #[must_use]
    pub fn to_record(&self, identifier: &Identifier) -> Option<ResultRecord> {
        let unavailable = |status| Some(ResultRecord::unavailable(identifier.clone(), status));

        match self {
            Self::RateLimited | Self::CaptchaInvalid => None,
            Self::IdentifierInvalid => unavailable(LookupStatus::Invalid),
            Self::PurchaseDateUnverifiable => unavailable(LookupStatus::CannotVerifyPurchaseDate),
            Self::RequestRejected => unavailable(LookupStatus::CannotProcess),
            Self::Unknown { .. } => unavailable(LookupStatus::Unknown),
            Self::CoverageFound { kind, details } => {
                let status = match kind {
                    CoverageKind::Detailed => LookupStatus::Valid,
                    CoverageKind::BenefitsListed | CoverageKind::Expired => {
                        LookupStatus::FullyValid
                    }
                };
                let or_not_found =
                    |field: &Option<String>| field.clone().unwrap_or_else(|| NOT_FOUND.to_string());

                Some(ResultRecord {
                    identifier: identifier.clone(),
                    product_name: or_not_found(&details.product_name),
                    purchase_date: or_not_found(&details.purchase_date),
                    coverage_expiry: or_not_found(&details.coverage_expiry),
                    status,
                })
            }
        }
    }
}

/// Submits coverage lookups and classifies the responses.
pub struct CoverageQueryEngine {
    api: Arc<dyn CoverageApi>,
}

impl CoverageQueryEngine {
    /// Create an engine over the given transport.
    #[must_use]
    pub fn new(api: Arc<dyn CoverageApi>) -> Self {
        Self { api }
    }

    /// Submit `solution` for `identifier` under `token` and classify the reply.
    pub async fn submit(
        &self,
        token: &SessionToken,
        solution: &CaptchaSolution,
        identifier: &Identifier,
    ) -> Result<QueryOutcome, ClientError> {
        let request = CoverageRequest::new(&solution.text, identifier);
        let body = self.api.submit_coverage(token, &request).await?;
        let outcome = QueryOutcome::from_body(&body);

        match &outcome {
            QueryOutcome::CoverageFound { details, .. } => {
                if let Some(echo) = &details.serial_echo {
                    if echo != identifier.as_str() {
                        tracing::warn!(
                            "Service echoed serial {} for lookup of {}",
                            echo,
                            identifier
                        );
                    }
                }
            }
            QueryOutcome::Unknown { body } => {
                tracing::warn!("An unknown response was returned for {}: {}", identifier, body);
            }
            _ => {}
        }

        Ok(outcome)
    }
}
