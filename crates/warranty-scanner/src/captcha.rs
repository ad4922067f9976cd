//! Captcha fetching and solving.
//!
//! The captcha endpoint returns a JSON envelope whose `binaryValue` field is
//! a base64-encoded image. When the service is busy it answers with a plain
//! apology page instead; that page is recognised by marker text and retried
//! after a backoff.

use crate::backoff::BackoffScheduler;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use warranty_client::{ClientError, CoverageApi, OcrBackend};
use warranty_core::SessionToken;

/// Body text of the captcha endpoint's soft rate-limit page.
pub const CAPTCHA_BUSY_MARKER: &str = "but we are currently unable to process";

/// Decoded challenge image and the token it was issued under.
#[derive(Debug, Clone)]
pub struct CaptchaChallenge {
    /// Encoded image bytes
    pub image: Vec<u8>,
    /// Token the challenge belongs to
    pub token: SessionToken,
}

/// OCR reading of a challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptchaSolution {
    /// Answer text with whitespace removed
    pub text: String,
    /// OCR confidence in `[0, 1]`
    pub confidence: f32,
}

/// Why a single fetch/solve attempt produced no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The service answered with its busy page
    RateLimited,
    /// The body was not the expected JSON envelope
    MalformedEnvelope(String),
    /// The envelope had no `binaryValue`
    MissingImage,
    /// `binaryValue` was not valid base64
    UndecodableImage(String),
    /// OCR found no legible text
    Unreadable,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => f.write_str("rate limited"),
            Self::MalformedEnvelope(e) => write!(f, "malformed captcha envelope: {e}"),
            Self::MissingImage => f.write_str("captcha envelope has no image"),
            Self::UndecodableImage(e) => write!(f, "captcha image is not valid base64: {e}"),
            Self::Unreadable => f.write_str("failed to detect captcha text"),
        }
    }
}

/// Outcome of one fetch/solve attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// OCR produced an answer
    Solved(CaptchaSolution),
    /// No answer; another attempt may succeed
    Retryable(RetryReason),
}

/// Outcome of [`CaptchaSolver::fetch_and_solve`].
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// OCR produced an answer
    Solved(CaptchaSolution),
    /// Every attempt failed; the token should be refreshed
    ExhaustedAttempts,
}

#[derive(Debug, Deserialize)]
struct CaptchaEnvelope {
    #[serde(rename = "binaryValue")]
    binary_value: Option<String>,
}

/// Fetches captcha challenges and reads them with OCR.
pub struct CaptchaSolver {
    api: Arc<dyn CoverageApi>,
    ocr: Arc<dyn OcrBackend>,
    backoff: BackoffScheduler,
    max_attempts: u32,
}

impl CaptchaSolver {
    /// Create a solver making at most `max_attempts` attempts per call.
    #[must_use]
    pub fn new(
        api: Arc<dyn CoverageApi>,
        ocr: Arc<dyn OcrBackend>,
        backoff: BackoffScheduler,
        max_attempts: u32,
    ) -> Self {
        Self {
            api,
            ocr,
            backoff,
            max_attempts,
        }
    }

    /// Fetch and solve a challenge under `token`.
    ///
    /// Busy responses back off and consume an attempt, as do unreadable
    /// challenges. Transport and OCR engine errors are returned to the caller.
    pub async fn fetch_and_solve(&self, token: &SessionToken) -> Result<SolveOutcome, ClientError> {
        for attempt in 1..=self.max_attempts {
            match self.attempt(token).await? {
                AttemptOutcome::Solved(solution) => {
                    tracing::debug!(
                        "Captcha read as {:?} (confidence {:.2})",
                        solution.text,
                        solution.confidence
                    );
                    return Ok(SolveOutcome::Solved(solution));
                }
                AttemptOutcome::Retryable(RetryReason::RateLimited) => {
                    tracing::warn!("Rate limit reached while fetching captcha, waiting...");
                    self.backoff.delay(attempt).await;
                }
                AttemptOutcome::Retryable(reason) => {
                    tracing::warn!(
                        "Captcha attempt {}/{} failed: {}",
                        attempt,
                        self.max_attempts,
                        reason
                    );
                }
            }
        }

        Ok(SolveOutcome::ExhaustedAttempts)
    }

    /// One fetch/decode/OCR cycle.
    pub async fn attempt(&self, token: &SessionToken) -> Result<AttemptOutcome, ClientError> {
        let body = self.api.fetch_captcha(token).await?;

        let challenge = match decode_challenge(&body, token) {
            Ok(challenge) => challenge,
            Err(reason) => return Ok(AttemptOutcome::Retryable(reason)),
        };

        self.solve(&challenge).await
    }

    /// Run OCR over a decoded challenge and keep the top candidate.
    pub async fn solve(&self, challenge: &CaptchaChallenge) -> Result<AttemptOutcome, ClientError> {
        let candidates = self.ocr.recognize(&challenge.image).await?;

        let Some(best) = candidates.into_iter().next() else {
            return Ok(AttemptOutcome::Retryable(RetryReason::Unreadable));
        };

        let text: String = best.text.split_whitespace().collect();
        if text.is_empty() {
            return Ok(AttemptOutcome::Retryable(RetryReason::Unreadable));
        }

        Ok(AttemptOutcome::Solved(CaptchaSolution {
            text,
            confidence: best.confidence,
        }))
    }
}

/// Turn a captcha endpoint body into a challenge, or say why it can't be.
pub fn decode_challenge(body: &str, token: &SessionToken) -> Result<CaptchaChallenge, RetryReason> {
    if body.contains(CAPTCHA_BUSY_MARKER) {
        return Err(RetryReason::RateLimited);
    }

    let envelope: CaptchaEnvelope = serde_json::from_str(body)
        .map_err(|e| RetryReason::MalformedEnvelope(e.to_string()))?;

    let encoded = envelope.binary_value.ok_or(RetryReason::MissingImage)?;
    let image = BASE64
        .decode(encoded.trim())
        .map_err(|e| RetryReason::UndecodableImage(e.to_string()))?;

    Ok(CaptchaChallenge {
        image,
        token: token.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SessionToken {
        SessionToken::new("t")
    }

    #[test]
    fn test_decode_valid_envelope() {
        let body = format!(r#"{{"binaryValue":"{}","type":"image"}}"#, BASE64.encode(b"PNGDATA"));
        let challenge = decode_challenge(&body, &token()).expect("decodable");
        assert_eq!(challenge.image, b"PNGDATA");
        assert_eq!(challenge.token, token());
    }

    #[test]
    fn test_decode_busy_page() {
        let body = "<html>We're sorry, but we are currently unable to process your request.</html>";
        assert_eq!(
            decode_challenge(body, &token()).unwrap_err(),
            RetryReason::RateLimited
        );
    }

    #[test]
    fn test_decode_missing_image() {
        assert_eq!(
            decode_challenge(r#"{"type":"image"}"#, &token()).unwrap_err(),
            RetryReason::MissingImage
        );
    }

    #[test]
    fn test_decode_bad_base64() {
        let err = decode_challenge(r#"{"binaryValue":"***"}"#, &token()).unwrap_err();
        assert!(matches!(err, RetryReason::UndecodableImage(_)));
    }

    #[test]
    fn test_decode_not_json() {
        let err = decode_challenge("<html>maintenance</html>", &token()).unwrap_err();
        assert!(matches!(err, RetryReason::MalformedEnvelope(_)));
    }

    #[test]
    fn test_retry_reason_display() {
        assert_eq!(
            RetryReason::Unreadable.to_string(),
            "failed to detect captcha text"
        );
    }
}
