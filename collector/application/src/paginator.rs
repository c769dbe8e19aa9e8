use std::sync::Arc;

use tracing::warn;

use crate::ports::{ChartQuery, FetchPage, TerminalError, TerminalSession, DAILY_CHART_QUERY};
use crate::rate_limiter::RateLimiter;

/// Token passed on the first request of a pagination run.
pub const FRESH_CONTEXT_TOKEN: &str = "0";

const NO_MORE_PAGES_TOKEN: &str = "0";

/// Continuation marker, converted from the raw terminal token once at
/// this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    MorePages,
    NoMorePages,
}

impl Continuation {
    pub fn from_token(raw: &str) -> Self {
        if raw.trim() == NO_MORE_PAGES_TOKEN {
            Continuation::NoMorePages
        } else {
            Continuation::MorePages
        }
    }
}

/// Drives one instrument's fetch loop against the terminal session. The
/// page sequence is lazy, finite and non-restartable: pages are fetched
/// on demand and once the cursor is exhausted every further call returns
/// `Ok(None)`.
pub struct RequestPaginator {
    session: Arc<dyn TerminalSession>,
    rate_limiter: Arc<dyn RateLimiter>,
    query: ChartQuery,
    continuation_token: String,
    requests_sent: usize,
    max_requests: usize,
    exhausted: bool,
}

impl RequestPaginator {
    pub fn new(
        session: Arc<dyn TerminalSession>,
        rate_limiter: Arc<dyn RateLimiter>,
        query: ChartQuery,
        max_requests: usize,
    ) -> Self {
        Self {
            session,
            rate_limiter,
            query,
            continuation_token: FRESH_CONTEXT_TOKEN.to_string(),
            requests_sent: 0,
            max_requests,
            exhausted: false,
        }
    }

    /// Fetches the next page. Exhaustion happens on a `"0"` token, on a
    /// failed request (the error is surfaced once), or at the request
    /// cap bounding runaway pagination.
    pub async fn next_page(&mut self) -> Result<Option<FetchPage>, TerminalError> {
        if self.exhausted {
            return Ok(None);
        }

        if self.requests_sent >= self.max_requests {
            warn!(
                instrument_id = %self.query.instrument_id,
                max_requests = self.max_requests,
                "Request cap reached, ending pagination"
            );
            self.exhausted = true;
            return Ok(None);
        }

        self.rate_limiter.acquire().await;

        let result = self
            .session
            .request(DAILY_CHART_QUERY, &self.query, &self.continuation_token)
            .await;
        self.requests_sent += 1;

        match result {
            Ok(page) => {
                match Continuation::from_token(&page.continuation_token) {
                    Continuation::NoMorePages => self.exhausted = true,
                    Continuation::MorePages => {
                        self.continuation_token = page.continuation_token.clone();
                    }
                }
                Ok(Some(page))
            }
            Err(e) => {
                self.exhausted = true;
                Err(e)
            }
        }
    }

    pub fn requests_sent(&self) -> usize {
        self.requests_sent
    }
}
