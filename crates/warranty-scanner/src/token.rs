//! Session token acquisition.

use crate::backoff::BackoffScheduler;
use crate::error::{LookupError, Result};
use std::sync::Arc;
use warranty_client::CoverageApi;
use warranty_core::SessionToken;

/// Acquires session tokens, backing off while issuance is rate limited.
pub struct SessionTokenClient {
    api: Arc<dyn CoverageApi>,
    backoff: BackoffScheduler,
    retries: u32,
}

impl SessionTokenClient {
    /// Create a token client that retries a missing token `retries` times.
    #[must_use]
    pub fn new(api: Arc<dyn CoverageApi>, backoff: BackoffScheduler, retries: u32) -> Self {
        Self {
            api,
            backoff,
            retries,
        }
    }

    /// Acquire a fresh session token.
    ///
    /// A response without the token header, or a transient transport
    /// failure, counts as one failed try. After `retries + 1` failed tries
    /// the service is considered to be refusing tokens and
    /// [`LookupError::TokenUnavailable`] is returned.
    pub async fn acquire(&self) -> Result<SessionToken> {
        let attempts = self.retries.saturating_add(1);

        for attempt in 1..=attempts {
            match self.api.request_token().await {
                Ok(Some(token)) => {
                    tracing::debug!("Acquired session token (try {}/{})", attempt, attempts);
                    return Ok(token);
                }
                Ok(None) => {
                    tracing::warn!(
                        "Unable to retrieve the authentication token due to rate limit (try {}/{})",
                        attempt,
                        attempts
                    );
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        "Token request failed (try {}/{}): {}",
                        attempt,
                        attempts,
                        e
                    );
                }
                Err(e) => return Err(e.into()),
            }

            if attempt < attempts {
                self.backoff.delay(attempt).await;
            }
        }

        Err(LookupError::TokenUnavailable { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use warranty_client::{ClientError, CoverageRequest};

    struct TokenScript {
        responses: Mutex<VecDeque<Option<&'static str>>>,
        calls: Mutex<u32>,
    }

    impl TokenScript {
        fn new(responses: Vec<Option<&'static str>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl CoverageApi for TokenScript {
        async fn request_token(&self) -> warranty_client::Result<Option<SessionToken>> {
            *self.calls.lock().unwrap() += 1;
            let next = self.responses.lock().unwrap().pop_front().flatten();
            Ok(next.map(SessionToken::new))
        }

        async fn fetch_captcha(&self, _token: &SessionToken) -> warranty_client::Result<String> {
            Err(ClientError::Internal("not scripted".to_string()))
        }

        async fn submit_coverage(
            &self,
            _token: &SessionToken,
            _request: &CoverageRequest<'_>,
        ) -> warranty_client::Result<String> {
            Err(ClientError::Internal("not scripted".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_first_try() {
        let api = TokenScript::new(vec![Some("abc")]);
        let client = SessionTokenClient::new(api.clone(), BackoffScheduler::default(), 2);

        let token = client.acquire().await.expect("token");
        assert_eq!(token.expose(), "abc");
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_retries_missing_header() {
        let api = TokenScript::new(vec![None, None, Some("late")]);
        let client = SessionTokenClient::new(api.clone(), BackoffScheduler::default(), 2);

        let token = client.acquire().await.expect("token on third try");
        assert_eq!(token.expose(), "late");
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_gives_up() {
        let api = TokenScript::new(vec![]);
        let client = SessionTokenClient::new(api.clone(), BackoffScheduler::default(), 2);

        let err = client.acquire().await.expect_err("no token");
        assert!(matches!(err, LookupError::TokenUnavailable { attempts: 3 }));
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_fails_fast() {
        let api = TokenScript::new(vec![None, Some("never reached")]);
        let client = SessionTokenClient::new(api.clone(), BackoffScheduler::default(), 0);

        let start = tokio::time::Instant::now();
        let err = client.acquire().await.expect_err("fail fast");
        assert!(matches!(err, LookupError::TokenUnavailable { attempts: 1 }));
        assert_eq!(api.calls(), 1);
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    }
}
