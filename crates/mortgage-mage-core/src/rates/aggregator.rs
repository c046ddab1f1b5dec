use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AggregatorConfig;
use crate::error::MortgageMageError;
use crate::rates::quote::{LtvBucket, RateQuote};
use crate::rates::source::RateSource;
use crate::types::{LienPosition, Rate};
use crate::MortgageMageResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Empirical rate distribution for one (lien, LTV bucket) pair.
///
/// Rates are kept sorted ascending; the collection is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateDistribution {
    pub lien: LienPosition,
    pub bucket: LtvBucket,
    rates: Vec<Rate>,
    /// Number of distinct sources that contributed quotes
    pub source_count: usize,
}

impl RateDistribution {
    /// Build a distribution from raw rates. Rejects empty input and rates
    /// outside (0, 1).
    pub fn from_rates(
        lien: LienPosition,
        bucket: LtvBucket,
        mut rates: Vec<Rate>,
        source_count: usize,
    ) -> MortgageMageResult<Self> {
        if rates.is_empty() {
            return Err(MortgageMageError::NoData {
                lien,
                bucket: bucket.to_string(),
            });
        }
        if let Some(bad) = rates
            .iter()
            .find(|r| **r <= Decimal::ZERO || **r >= Decimal::ONE)
        {
            return Err(MortgageMageError::InvalidInput {
                field: "rates".into(),
                reason: format!("Rate {bad} is outside (0, 1)"),
            });
        }
        rates.sort();
        Ok(Self {
            lien,
            bucket,
            rates,
            source_count,
        })
    }

    pub fn rates(&self) -> &[Rate] {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn min(&self) -> Rate {
        self.rates[0]
    }

    pub fn max(&self) -> Rate {
        self.rates[self.rates.len() - 1]
    }

    pub fn mean(&self) -> Rate {
        let sum: Decimal = self.rates.iter().copied().sum();
        sum / Decimal::from(self.rates.len() as u64)
    }

    /// Median rate; the mean of the two middle values for even counts.
    pub fn median(&self) -> Rate {
        let n = self.rates.len();
        if n % 2 == 0 {
            (self.rates[n / 2 - 1] + self.rates[n / 2]) / Decimal::TWO
        } else {
            self.rates[n / 2]
        }
    }

    /// Percentile (0-100) using linear interpolation between order statistics.
    pub fn percentile(&self, p: Decimal) -> Rate {
        let n = self.rates.len();
        if n == 1 {
            return self.rates[0];
        }
        let p = p.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED);
        let rank = p / Decimal::ONE_HUNDRED * Decimal::from(n as u64 - 1);
        let lower = rank.floor();
        let frac = rank - lower;
        let lower_idx = lower.to_usize().unwrap_or(0).min(n - 1);
        let upper_idx = (lower_idx + 1).min(n - 1);
        self.rates[lower_idx] * (Decimal::ONE - frac) + self.rates[upper_idx] * frac
    }
}

/// Median rate at one LTV bucket, as produced by `ltv_sweep`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LtvSweepPoint {
    pub bucket: LtvBucket,
    pub quote_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_rate: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Merges quotes from every registered source into per-bucket distributions.
pub struct RateAggregator {
    sources: Vec<Box<dyn RateSource>>,
    config: AggregatorConfig,
    as_of: DateTime<Utc>,
}

impl RateAggregator {
    /// `as_of` anchors the staleness window; quotes observed before
    /// `as_of - staleness_days` are discarded.
    pub fn new(config: AggregatorConfig, as_of: DateTime<Utc>) -> MortgageMageResult<Self> {
        config.validate()?;
        Ok(Self {
            sources: Vec::new(),
            config,
            as_of,
        })
    }

    pub fn with_source(mut self, source: impl RateSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_source(&mut self, source: Box<dyn RateSource>) {
        self.sources.push(source);
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn bucket_for(&self, ltv: Rate) -> MortgageMageResult<LtvBucket> {
        LtvBucket::containing(ltv, self.config.bucket_width)
    }

    /// Distribution of rates for `lien` at the bucket containing `ltv`.
    pub fn get_rate_distribution(
        &self,
        lien: LienPosition,
        ltv: Rate,
    ) -> MortgageMageResult<RateDistribution> {
        let bucket = self.bucket_for(ltv)?;
        self.distribution_for_bucket(lien, bucket)
    }

    pub fn distribution_for_bucket(
        &self,
        lien: LienPosition,
        bucket: LtvBucket,
    ) -> MortgageMageResult<RateDistribution> {
        let quotes = self.collect_quotes(lien, bucket);
        let mut contributing: Vec<&str> = quotes.iter().map(|q| q.source_id.as_str()).collect();
        contributing.sort_unstable();
        contributing.dedup();
        let source_count = contributing.len();

        debug!(
            lien = %lien,
            bucket = %bucket,
            quotes = quotes.len(),
            sources = source_count,
            "aggregated rate quotes"
        );

        let rates = quotes.iter().map(|q| q.rate).collect();
        RateDistribution::from_rates(lien, bucket, rates, source_count)
    }

    /// Median rate per bucket across the whole LTV range. Empty buckets are
    /// reported with no median instead of failing the sweep.
    pub fn ltv_sweep(&self, lien: LienPosition) -> Vec<LtvSweepPoint> {
        let width = self.config.bucket_width;
        (0..LtvBucket::count(width))
            .filter_map(|i| LtvBucket::at(i, width))
            .map(|bucket| match self.distribution_for_bucket(lien, bucket) {
                Ok(dist) => LtvSweepPoint {
                    bucket,
                    quote_count: dist.len(),
                    median_rate: Some(dist.median()),
                },
                Err(_) => LtvSweepPoint {
                    bucket,
                    quote_count: 0,
                    median_rate: None,
                },
            })
            .collect()
    }

    fn collect_quotes(&self, lien: LienPosition, bucket: LtvBucket) -> Vec<RateQuote> {
        let cutoff = self.as_of - Duration::days(self.config.staleness_days);
        let mut merged = Vec::new();

        for source in &self.sources {
            let quotes = match source.fetch_quotes(lien, bucket.range()) {
                Ok(q) => q,
                Err(e) => {
                    warn!(source = source.source_id(), error = %e, "rate source failed, skipping");
                    continue;
                }
            };

            let before = quotes.len();
            let mut stale = 0usize;
            let mut invalid = 0usize;
            for quote in quotes {
                if quote.lien != lien || !bucket.contains(quote.ltv) {
                    continue;
                }
                if quote.observed_at < cutoff {
                    stale += 1;
                    continue;
                }
                if !quote.has_valid_rate() {
                    invalid += 1;
                    continue;
                }
                merged.push(quote);
            }

            if invalid > 0 {
                warn!(
                    source = source.source_id(),
                    invalid, "discarded quotes with rates outside (0, 1)"
                );
            }
            debug!(
                source = source.source_id(),
                fetched = before,
                stale,
                "filtered source quotes"
            );
        }

        merged
    }
}
