use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::rates::aggregator::{RateAggregator, RateDistribution};
use crate::rates::quote::LtvBucket;
use crate::types::{LienPosition, Rate};
use crate::MortgageMageResult;

/// Run-scoped memo of rate distributions.
///
/// Each (lien, bucket) is pulled from the aggregator at most once while the
/// cache lives, so every lookup in one run sees the same distribution. Create
/// one per run and drop it afterwards; failures are not cached.
pub struct RateCache<'a> {
    aggregator: &'a RateAggregator,
    entries: Mutex<HashMap<(LienPosition, u32), Arc<RateDistribution>>>,
}

impl<'a> RateCache<'a> {
    pub fn new(aggregator: &'a RateAggregator) -> Self {
        Self {
            aggregator,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn aggregator(&self) -> &'a RateAggregator {
        self.aggregator
    }

    pub fn bucket_for(&self, ltv: Rate) -> MortgageMageResult<LtvBucket> {
        self.aggregator.bucket_for(ltv)
    }

    pub fn get(&self, lien: LienPosition, ltv: Rate) -> MortgageMageResult<Arc<RateDistribution>> {
        let bucket = self.bucket_for(ltv)?;
        self.get_bucket(lien, bucket)
    }

    pub fn get_bucket(
        &self,
        lien: LienPosition,
        bucket: LtvBucket,
    ) -> MortgageMageResult<Arc<RateDistribution>> {
        let key = (lien, bucket.index);
        if let Some(hit) = self.lock().get(&key) {
            return Ok(Arc::clone(hit));
        }

        // Fetched outside the lock so a slow source does not serialise
        // lookups for other buckets.
        let dist = Arc::new(self.aggregator.distribution_for_bucket(lien, bucket)?);
        let mut entries = self.lock();
        let entry = entries.entry(key).or_insert_with(|| Arc::clone(&dist));
        Ok(Arc::clone(entry))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<(LienPosition, u32), Arc<RateDistribution>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregatorConfig;
    use crate::rates::quote::{LtvRange, RateQuote};
    use crate::rates::source::{RateSource, RateSourceError};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        calls: Arc<AtomicU32>,
    }

    impl RateSource for CountingSource {
        fn source_id(&self) -> &str {
            "counting"
        }

        fn fetch_quotes(
            &self,
            lien: LienPosition,
            range: LtvRange,
        ) -> Result<Vec<RateQuote>, RateSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RateQuote {
                source_id: "counting".into(),
                ltv: range.min,
                lien,
                rate: dec!(0.06),
                observed_at: Utc::now(),
            }])
        }
    }

    #[test]
    fn test_each_bucket_fetched_once_per_cache() {
        let calls = Arc::new(AtomicU32::new(0));
        let aggregator = RateAggregator::new(AggregatorConfig::default(), Utc::now())
            .unwrap()
            .with_source(CountingSource {
                calls: Arc::clone(&calls),
            });

        let cache = RateCache::new(&aggregator);
        let a = cache.get(LienPosition::First, dec!(0.81)).unwrap();
        let b = cache.get(LienPosition::First, dec!(0.84)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.get(LienPosition::Second, dec!(0.84)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);

        // A fresh cache (new run) pulls again
        let next_run = RateCache::new(&aggregator);
        next_run.get(LienPosition::First, dec!(0.81)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
