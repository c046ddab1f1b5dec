use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::rates::quote::{LtvRange, RateQuote};
use crate::types::LienPosition;

/// Failure reported by a rate source.
#[derive(Debug, Clone, Error)]
pub enum RateSourceError {
    /// Network-style failure worth retrying.
    #[error("transient failure from {source_id}: {message}")]
    Transient { source_id: String, message: String },

    #[error("{source_id} unavailable: {message}")]
    Unavailable { source_id: String, message: String },
}

impl RateSourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RateSourceError::Transient { .. })
    }
}

/// A market rate feed. Adapters turn vendor responses into `RateQuote`s
/// before anything else sees them.
pub trait RateSource: Send + Sync {
    fn source_id(&self) -> &str;

    fn fetch_quotes(
        &self,
        lien: LienPosition,
        range: LtvRange,
    ) -> Result<Vec<RateQuote>, RateSourceError>;
}

impl<S: RateSource + ?Sized> RateSource for Box<S> {
    fn source_id(&self) -> &str {
        (**self).source_id()
    }

    fn fetch_quotes(
        &self,
        lien: LienPosition,
        range: LtvRange,
    ) -> Result<Vec<RateQuote>, RateSourceError> {
        (**self).fetch_quotes(lien, range)
    }
}

// ---------------------------------------------------------------------------
// Static source
// ---------------------------------------------------------------------------

/// In-memory quotes, e.g. loaded from a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticRateSource {
    pub source_id: String,
    pub quotes: Vec<RateQuote>,
}

impl StaticRateSource {
    pub fn new(source_id: impl Into<String>, quotes: Vec<RateQuote>) -> Self {
        Self {
            source_id: source_id.into(),
            quotes,
        }
    }
}

impl RateSource for StaticRateSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch_quotes(
        &self,
        lien: LienPosition,
        range: LtvRange,
    ) -> Result<Vec<RateQuote>, RateSourceError> {
        Ok(self
            .quotes
            .iter()
            .filter(|q| q.lien == lien && range.contains(q.ltv))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Retry wrapper
// ---------------------------------------------------------------------------

/// Retries transient failures with a fixed wait between attempts.
/// Non-transient errors are returned immediately.
pub struct RetryingSource<S> {
    inner: S,
    max_attempts: u32,
    backoff: Duration,
}

impl<S: RateSource> RetryingSource<S> {
    /// Three attempts, two seconds apart.
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, 3, Duration::from_secs(2))
    }

    pub fn with_policy(inner: S, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl<S: RateSource> RateSource for RetryingSource<S> {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    fn fetch_quotes(
        &self,
        lien: LienPosition,
        range: LtvRange,
    ) -> Result<Vec<RateQuote>, RateSourceError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch_quotes(lien, range) {
                Ok(quotes) => return Ok(quotes),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        source = self.inner.source_id(),
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "rate source failed, retrying"
                    );
                    if !self.backoff.is_zero() {
                        thread::sleep(self.backoff);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
