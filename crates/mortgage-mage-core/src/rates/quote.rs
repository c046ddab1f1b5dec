use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MortgageMageError;
use crate::types::{LienPosition, Rate};
use crate::MortgageMageResult;

/// A single normalised rate quote. Every source adapter produces this shape;
/// nothing downstream knows which market a quote came from beyond `source_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub source_id: String,
    /// Loan-to-value the quote was requested at
    pub ltv: Rate,
    pub lien: LienPosition,
    /// Annual rate in decimal form (0.065 = 6.5%)
    pub rate: Rate,
    pub observed_at: DateTime<Utc>,
}

impl RateQuote {
    /// Rates must be positive and below 100%.
    pub fn has_valid_rate(&self) -> bool {
        self.rate > Decimal::ZERO && self.rate < Decimal::ONE
    }
}

/// Inclusive LTV interval passed to rate sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LtvRange {
    pub min: Rate,
    pub max: Rate,
}

impl LtvRange {
    pub fn contains(&self, ltv: Rate) -> bool {
        ltv >= self.min && ltv <= self.max
    }
}

/// One of the disjoint LTV buckets covering [0, 1]. Buckets are half-open
/// `[lower, upper)` except the last, which also contains 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LtvBucket {
    pub index: u32,
    pub lower: Rate,
    pub upper: Rate,
    pub is_last: bool,
}

impl LtvBucket {
    /// Number of buckets a given width produces.
    pub fn count(width: Rate) -> u32 {
        (Decimal::ONE / width).floor().to_u32().unwrap_or(1).max(1)
    }

    /// Bucket at `index` for the given width.
    pub fn at(index: u32, width: Rate) -> Option<LtvBucket> {
        let count = Self::count(width);
        if index >= count {
            return None;
        }
        let lower = width * Decimal::from(index);
        let is_last = index + 1 == count;
        let upper = if is_last {
            Decimal::ONE
        } else {
            lower + width
        };
        Some(LtvBucket {
            index,
            lower,
            upper,
            is_last,
        })
    }

    /// Bucket containing `ltv`. Fails for LTVs outside [0, 1].
    pub fn containing(ltv: Rate, width: Rate) -> MortgageMageResult<LtvBucket> {
        if ltv < Decimal::ZERO || ltv > Decimal::ONE {
            return Err(MortgageMageError::InvalidInput {
                field: "ltv".into(),
                reason: format!("LTV {ltv} is outside [0, 1]"),
            });
        }
        let count = Self::count(width);
        let index = (ltv / width)
            .floor()
            .to_u32()
            .unwrap_or(0)
            .min(count - 1);
        Self::at(index, width).ok_or_else(|| MortgageMageError::InvalidInput {
            field: "ltv".into(),
            reason: format!("No bucket for LTV {ltv}"),
        })
    }

    pub fn contains(&self, ltv: Rate) -> bool {
        if self.is_last {
            ltv >= self.lower && ltv <= self.upper
        } else {
            ltv >= self.lower && ltv < self.upper
        }
    }

    pub fn range(&self) -> LtvRange {
        LtvRange {
            min: self.lower,
            max: self.upper,
        }
    }
}

impl fmt::Display for LtvBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let close = if self.is_last { ']' } else { ')' };
        write!(f, "[{:.2}, {:.2}{}", self.lower, self.upper, close)
    }
}
