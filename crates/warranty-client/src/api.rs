//! Coverage service transport.
//!
//! The service exposes three endpoints: the site root (which issues a session
//! token in a response header), a captcha endpoint and the coverage lookup.
//! Responses are returned raw; deciding what a body means is the caller's job
//! because the service reports most outcomes as human-readable copy rather
//! than status codes.

use crate::error::{ClientError, Result};
use crate::user_agent::UserAgentProvider;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use warranty_core::{EndpointConfig, Identifier, SessionToken};

/// Request header the session token is sent back in.
const AUTH_TOKEN_HEADER: &str = "X-Apple-Auth-Token";

/// Build a standard HTTP client with the given timeout.
///
/// # Errors
/// Returns error if the HTTP client cannot be created.
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ClientError::Internal(format!("failed to create HTTP client: {e}")))
}

/// JSON body of the coverage lookup.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRequest<'a> {
    /// Text read from the captcha image
    pub captcha_answer: &'a str,
    /// Always `"image"`
    pub captcha_type: &'static str,
    /// Identifier being looked up
    pub serial_number: &'a str,
}

impl<'a> CoverageRequest<'a> {
    /// Build an image-captcha lookup for `identifier`.
    #[must_use]
    pub fn new(captcha_answer: &'a str, identifier: &'a Identifier) -> Self {
        Self {
            captcha_answer,
            captcha_type: "image",
            serial_number: identifier.as_str(),
        }
    }
}

/// Raw access to the coverage service endpoints.
#[async_trait]
pub trait CoverageApi: Send + Sync {
    /// Request a session token.
    ///
    /// Returns `Ok(None)` when the service answers without the token header,
    /// which is how it signals that token issuance is rate limited.
    async fn request_token(&self) -> Result<Option<SessionToken>>;

    /// Fetch a captcha challenge and return the raw response body.
    async fn fetch_captcha(&self, token: &SessionToken) -> Result<String>;

    /// Submit a coverage lookup and return the raw response body.
    async fn submit_coverage(
        &self,
        token: &SessionToken,
        request: &CoverageRequest<'_>,
    ) -> Result<String>;
}

/// `CoverageApi` backed by reqwest.
pub struct HttpCoverageApi {
    client: Client,
    endpoint: EndpointConfig,
    user_agents: UserAgentProvider,
}

impl HttpCoverageApi {
    /// Create a transport for the configured endpoints.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(endpoint.timeout_secs)?,
            endpoint: endpoint.clone(),
            user_agents: UserAgentProvider::from_override(endpoint.user_agent.as_deref()),
        })
    }

    async fn read_body(response: reqwest::Response, endpoint: &str) -> Result<String> {
        let status = response.status();
        tracing::debug!("{} responded with HTTP {}", endpoint, status.as_u16());
        // Body copy decides the outcome, not the status code
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CoverageApi for HttpCoverageApi {
    async fn request_token(&self) -> Result<Option<SessionToken>> {
        let response = self
            .client
            .get(&self.endpoint.base_url)
            .header(USER_AGENT, self.user_agents.pick())
            .send()
            .await?;

        tracing::debug!("token endpoint responded with HTTP {}", response.status().as_u16());

        let token = response
            .headers()
            .get(self.endpoint.token_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(SessionToken::new);

        Ok(token)
    }

    async fn fetch_captcha(&self, token: &SessionToken) -> Result<String> {
        let response = self
            .client
            .get(self.endpoint.url(&self.endpoint.captcha_path))
            .header(AUTH_TOKEN_HEADER, token.expose())
            .header(USER_AGENT, self.user_agents.pick())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        Self::read_body(response, "captcha endpoint").await
    }

    async fn submit_coverage(
        &self,
        token: &SessionToken,
        request: &CoverageRequest<'_>,
    ) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.url(&self.endpoint.coverage_path))
            .header(AUTH_TOKEN_HEADER, token.expose())
            .header(USER_AGENT, self.user_agents.pick())
            .json(request)
            .send()
            .await?;

        Self::read_body(response, "coverage endpoint").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(10).is_ok());
    }

    #[test]
    fn test_coverage_request_wire_format() {
        let serial = Identifier::new("XX1234567890").expect("valid identifier");
        let request = CoverageRequest::new("k7Pq2", &serial);

        let json = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(
            json,
            serde_json::json!({
                "captchaAnswer": "k7Pq2",
                "captchaType": "image",
                "serialNumber": "XX1234567890",
            })
        );
    }

    #[test]
    fn test_api_from_config() {
        let mut endpoint = EndpointConfig::default();
        endpoint.user_agent = Some("TestAgent/1.0".to_string());

        let api = HttpCoverageApi::new(&endpoint).expect("create api");
        assert_eq!(api.user_agents.pick(), "TestAgent/1.0");
        assert_eq!(api.endpoint.base_url, "https://checkcoverage.apple.com");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transient() {
        let mut endpoint = EndpointConfig::default();
        // Port 9 (discard) on loopback refuses connections on test hosts
        endpoint.base_url = "http://127.0.0.1:9".to_string();
        endpoint.timeout_secs = 2;

        let api = HttpCoverageApi::new(&endpoint).expect("create api");
        let err = api
            .request_token()
            .await
            .expect_err("connection should be refused");
        assert!(err.is_transient());
    }
}
