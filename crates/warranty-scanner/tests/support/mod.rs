#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use warranty_client::{ClientError, CoverageApi, CoverageRequest, OcrBackend, OcrCandidate};
use warranty_core::{Identifier, SessionToken};

pub const INVALID_SERIAL_BODY: &str =
    r#"{"error":"Please enter a valid serial number."}"#;
pub const CAPTCHA_MISMATCH_BODY: &str =
    r#"{"error":"The code you entered does not match the characters in the image."}"#;
pub const RATE_LIMITED_BODY: &str =
    "<html>We're sorry, we are unable to process your request. Please try again later.</html>";
pub const CAPTCHA_BUSY_BODY: &str =
    "<html>We're sorry, but we are currently unable to process your request.</html>";
pub const CANNOT_PROCESS_BODY: &str =
    r#"{"error":"We cannot process your request at this time."}"#;
pub const DETAIL_BODY: &str = r#"{"heading":"Apple coverage for your product","productName":"MacBook Pro (13-inch, M1, 2020)","purchaseDate":"Purchase Date: March 2022","coverage":"Expires on: "2026-01-01""}"#;

pub fn serial(value: &str) -> Identifier {
    Identifier::new(value).expect("valid identifier")
}

pub fn captcha_body() -> String {
    format!(
        r#"{{"binaryValue":"{}","type":"image"}}"#,
        BASE64.encode(b"\x89PNG fake image")
    )
}

/// A genuine transient transport failure: a refused connection to the
/// discard port on loopback.
pub async fn transient_error() -> ClientError {
    let client = warranty_client::build_http_client(2).expect("build client");
    let err = client
        .get("http://127.0.0.1:9/")
        .send()
        .await
        .expect_err("nothing listens on the discard port");
    let err = ClientError::Network(err);
    assert!(err.is_transient(), "refused connection should be transient: {err}");
    err
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub token: String,
    pub answer: String,
    pub serial: String,
}

/// `CoverageApi` that replays scripted responses and records every call.
///
/// Replies and errors are served in the order they were scripted.
/// Unscripted token requests get no token, unscripted captcha fetches get a
/// valid challenge and unscripted submissions fail.
#[derive(Default)]
pub struct ScriptedApi {
    tokens: Mutex<VecDeque<warranty_client::Result<Option<String>>>>,
    captchas: Mutex<VecDeque<warranty_client::Result<String>>>,
    coverage: Mutex<VecDeque<warranty_client::Result<String>>>,
    token_calls: Mutex<u32>,
    captcha_tokens: Mutex<Vec<String>>,
    submissions: Mutex<Vec<Submission>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(self, tokens: &[&str]) -> Self {
        self.tokens
            .lock()
            .unwrap()
            .extend(tokens.iter().map(|t| Ok(Some((*t).to_string()))));
        self
    }

    pub fn with_token_error(self, error: ClientError) -> Self {
        self.tokens.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_missing_tokens(self, count: usize) -> Self {
        self.tokens
            .lock()
            .unwrap()
            .extend((0..count).map(|_| Ok(None)));
        self
    }

    pub fn with_captchas(self, bodies: &[&str]) -> Self {
        self.captchas
            .lock()
            .unwrap()
            .extend(bodies.iter().map(|b| Ok((*b).to_string())));
        self
    }

    pub fn with_captcha_error(self, error: ClientError) -> Self {
        self.captchas.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_coverage(self, bodies: &[&str]) -> Self {
        self.coverage
            .lock()
            .unwrap()
            .extend(bodies.iter().map(|b| Ok((*b).to_string())));
        self
    }

    pub fn with_coverage_error(self, error: ClientError) -> Self {
        self.coverage.lock().unwrap().push_back(Err(error));
        self
    }


    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn token_calls(&self) -> u32 {
        *self.token_calls.lock().unwrap()
    }

    pub fn captcha_tokens(&self) -> Vec<String> {
        self.captcha_tokens.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl CoverageApi for ScriptedApi {
    async fn request_token(&self) -> warranty_client::Result<Option<SessionToken>> {
        *self.token_calls.lock().unwrap() += 1;
        match self.tokens.lock().unwrap().pop_front() {
            Some(next) => next.map(|token| token.map(SessionToken::new)),
            None => Ok(None),
        }
    }

    async fn fetch_captcha(&self, token: &SessionToken) -> warranty_client::Result<String> {
        self.captcha_tokens
            .lock()
            .unwrap()
            .push(token.expose().to_string());
        let scripted = self.captchas.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(captcha_body()))
    }

    async fn submit_coverage(
        &self,
        token: &SessionToken,
        request: &CoverageRequest<'_>,
    ) -> warranty_client::Result<String> {
        self.submissions.lock().unwrap().push(Submission {
            token: token.expose().to_string(),
            answer: request.captcha_answer.to_string(),
            serial: request.serial_number.to_string(),
        });
        self.coverage
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Internal("coverage script exhausted".to_string())))
    }
}

/// `OcrBackend` that replays scripted readings, then reads `AB12`.
#[derive(Default)]
pub struct FakeOcr {
    readings: Mutex<VecDeque<warranty_client::Result<Vec<OcrCandidate>>>>,
    calls: Mutex<u32>,
}

impl FakeOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reading(self, reading: warranty_client::Result<Vec<OcrCandidate>>) -> Self {
        self.readings.lock().unwrap().push_back(reading);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

pub fn candidate(text: &str, confidence: f32) -> OcrCandidate {
    OcrCandidate {
        text: text.to_string(),
        confidence,
    }
}

#[async_trait]
impl OcrBackend for FakeOcr {
    async fn recognize(&self, _image: &[u8]) -> warranty_client::Result<Vec<OcrCandidate>> {
        *self.calls.lock().unwrap() += 1;
        self.readings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![candidate("AB12", 0.91)]))
    }
}
