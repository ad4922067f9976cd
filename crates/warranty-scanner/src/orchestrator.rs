//! Lookup orchestrator driving identifiers through the captcha-gated flow.
//!
//! Each identifier moves through `AcquireToken -> SolveCaptcha ->
//! SubmitQuery` until a terminal outcome produces its [`ResultRecord`].
//! Rate limits, rejected captchas and transient transport failures are
//! absorbed here; only token starvation, exhausted transport retries, a
//! non-transient client error or a failing sink escape to the caller.

use crate::backoff::BackoffScheduler;
use crate::captcha::{CaptchaSolver, SolveOutcome};
use crate::error::{LookupError, Result};
use crate::query::{CoverageQueryEngine, QueryOutcome};
use crate::token::SessionTokenClient;
use std::collections::HashMap;
use std::sync::Arc;
use warranty_client::{ClientError, CoverageApi, OcrBackend};
use warranty_core::{
    Identifier, LookupStatus, RecordSink, ResultRecord, RetryConfig, SessionToken,
};

/// Per-identifier lookup state.
#[derive(Debug)]
pub struct LookupContext {
    /// Token the current challenges are issued under
    pub token: SessionToken,
    /// Rejected captcha answers since the last token refresh
    pub invalid_captchas: u32,
    /// Consecutive rate-limited submissions since the last other outcome
    pub rate_limit_streak: u32,
    /// Token refreshes performed for this identifier
    pub token_refreshes: u32,
    /// Transient transport failures for this identifier
    pub transport_errors: u32,
}

impl LookupContext {
    /// Fresh context for a newly acquired token.
    #[must_use]
    pub fn new(token: SessionToken) -> Self {
        Self {
            token,
            invalid_captchas: 0,
            rate_limit_streak: 0,
            token_refreshes: 0,
            transport_errors: 0,
        }
    }

    /// Swap in a refreshed token and reset the per-token counters.
    pub fn refresh(&mut self, token: SessionToken) {
        self.token = token;
        self.invalid_captchas = 0;
        self.rate_limit_streak = 0;
        self.token_refreshes += 1;
    }
}

/// Status counts for a completed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Identifiers that produced a record
    pub processed: usize,
    /// Records per status
    pub counts: HashMap<LookupStatus, usize>,
}

impl BatchSummary {
    fn record(&mut self, status: LookupStatus) {
        self.processed += 1;
        *self.counts.entry(status).or_insert(0) += 1;
    }

    /// Number of records with `status`.
    #[must_use]
    pub fn count(&self, status: LookupStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }
}

/// Drives coverage lookups one identifier at a time.
pub struct LookupOrchestrator {
    tokens: SessionTokenClient,
    solver: CaptchaSolver,
    engine: CoverageQueryEngine,
    backoff: BackoffScheduler,
    invalid_captcha_limit: u32,
    max_transport_errors: u32,
    max_token_refreshes: Option<u32>,
}

impl LookupOrchestrator {
    /// Create an orchestrator over the given transport and OCR engine.
    #[must_use]
    pub fn new(api: Arc<dyn CoverageApi>, ocr: Arc<dyn OcrBackend>, retry: &RetryConfig) -> Self {
        let backoff = BackoffScheduler::from_config(retry);

        Self {
            tokens: SessionTokenClient::new(api.clone(), backoff.clone(), retry.token_retries),
            solver: CaptchaSolver::new(api.clone(), ocr, backoff.clone(), retry.captcha_attempts),
            engine: CoverageQueryEngine::new(api),
            backoff,
            invalid_captcha_limit: retry.invalid_captcha_limit,
            max_transport_errors: retry.max_transport_errors,
            max_token_refreshes: retry.max_token_refreshes,
        }
    }

    /// Look up every identifier in order, appending each record to `sink`
    /// before moving on.
    ///
    /// Records appended before a fatal error stay in the sink.
    pub async fn run_batch<S: RecordSink + ?Sized>(
        &self,
        identifiers: &[Identifier],
        sink: &mut S,
    ) -> Result<BatchSummary> {
        let total = identifiers.len();
        let mut summary = BatchSummary::default();

        for (index, identifier) in identifiers.iter().enumerate() {
            tracing::info!("Processing serial {}/{}: {}", index + 1, total, identifier);

            let record = self.lookup(identifier).await?;
            sink.append(&record)?;
            summary.record(record.status);
        }

        tracing::info!("Processed {} serial number(s)", summary.processed);
        Ok(summary)
    }

    /// Resolve a single identifier to its result record.
    pub async fn lookup(&self, identifier: &Identifier) -> Result<ResultRecord> {
        let mut ctx = LookupContext::new(self.tokens.acquire().await?);

        loop {
            let solution = match self.solver.fetch_and_solve(&ctx.token).await {
                Ok(SolveOutcome::Solved(solution)) => solution,
                Ok(SolveOutcome::ExhaustedAttempts) => {
                    tracing::warn!("Failed to solve captcha for {}, refreshing token", identifier);
                    if let Some(record) = self.refresh_token(&mut ctx, identifier).await? {
                        return Ok(record);
                    }
                    continue;
                }
                Err(e) => {
                    self.absorb_transport_error(&mut ctx, identifier, e).await?;
                    continue;
                }
            };

            let outcome = match self.engine.submit(&ctx.token, &solution, identifier).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.absorb_transport_error(&mut ctx, identifier, e).await?;
                    continue;
                }
            };

            if let Some(record) = outcome.to_record(identifier) {
                tracing::info!("Serial {}: {}", identifier, record.status);
                return Ok(record);
            }

            if outcome == QueryOutcome::RateLimited {
                ctx.rate_limit_streak += 1;
                tracing::warn!(
                    "Rate limit reached for {} ({} in a row), waiting...",
                    identifier,
                    ctx.rate_limit_streak
                );
                self.backoff.delay(ctx.rate_limit_streak).await;
                continue;
            }

            ctx.rate_limit_streak = 0;
            ctx.invalid_captchas += 1;
            tracing::warn!(
                "Invalid captcha for {} ({}/{})",
                identifier,
                ctx.invalid_captchas,
                self.invalid_captcha_limit
            );

            if ctx.invalid_captchas >= self.invalid_captcha_limit {
                tracing::warn!(
                    "Too many invalid captchas for {}, refreshing token",
                    identifier
                );
                if let Some(record) = self.refresh_token(&mut ctx, identifier).await? {
                    return Ok(record);
                }
            }
        }
    }

    /// Acquire a new token, or give up on the identifier once the refresh
    /// budget is spent.
    async fn refresh_token(
        &self,
        ctx: &mut LookupContext,
        identifier: &Identifier,
    ) -> Result<Option<ResultRecord>> {
        if let Some(max) = self.max_token_refreshes {
            if ctx.token_refreshes >= max {
                tracing::warn!(
                    "Giving up on {} after {} token refresh(es)",
                    identifier,
                    ctx.token_refreshes
                );
                return Ok(Some(ResultRecord::unavailable(
                    identifier.clone(),
                    LookupStatus::RetriesExhausted,
                )));
            }
        }

        let token = self.tokens.acquire().await?;
        ctx.refresh(token);
        Ok(None)
    }

    async fn absorb_transport_error(
        &self,
        ctx: &mut LookupContext,
        identifier: &Identifier,
        error: ClientError,
    ) -> Result<()> {
        if !error.is_transient() {
            return Err(error.into());
        }

        ctx.transport_errors += 1;
        if ctx.transport_errors > self.max_transport_errors {
            return Err(LookupError::TransportExhausted {
                identifier: identifier.to_string(),
                failures: ctx.transport_errors,
                source: error,
            });
        }

        tracing::warn!(
            "Transport error for {} ({}/{}): {}",
            identifier,
            ctx.transport_errors,
            self.max_transport_errors,
            error
        );
        self.backoff.delay(ctx.transport_errors).await;
        Ok(())
    }
}
