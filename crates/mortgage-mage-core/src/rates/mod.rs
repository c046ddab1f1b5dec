pub mod aggregator;
pub mod cache;
pub mod quote;
pub mod source;

pub use aggregator::{LtvSweepPoint, RateAggregator, RateDistribution};
pub use cache::RateCache;
pub use quote::{LtvBucket, LtvRange, RateQuote};
pub use source::{RateSource, RateSourceError, RetryingSource, StaticRateSource};
