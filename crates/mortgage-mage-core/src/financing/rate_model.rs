use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::RateModelConfig;
use crate::error::MortgageMageError;
use crate::financing::terms::{FinancingTerms, LoanTranche};
use crate::rates::{LtvBucket, RateAggregator, RateCache, RateDistribution};
use crate::types::{LienPosition, Money, Periods, Rate};
use crate::MortgageMageResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Subordinate loan requested alongside the first lien.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondLienRequest {
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortization_periods: Option<Periods>,
}

/// What the borrower asks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingRequest {
    /// First-lien loan amount
    pub loan_amount: Money,
    pub property_value: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_lien: Option<SecondLienRequest>,
    /// Overrides the configured first-lien term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortization_periods: Option<Periods>,
}

/// Financing terms together with the rate distributions they were priced
/// from.
#[derive(Debug, Clone, Serialize)]
pub struct FinancingQuote {
    pub terms: FinancingTerms,
    /// First-lien loan-to-value
    pub ltv: Rate,
    /// (first + second) / value
    pub combined_ltv: Rate,
    pub first_lien_rates: RateDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_lien_rates: Option<RateDistribution>,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Prices financing requests off the aggregated market rates.
///
/// Holds a `RateCache`, so one model instance corresponds to one run: all
/// requests it serves see the same distributions.
pub struct MortgageRateModel<'a> {
    rates: RateCache<'a>,
    config: RateModelConfig,
}

impl<'a> MortgageRateModel<'a> {
    pub fn new(
        aggregator: &'a RateAggregator,
        config: RateModelConfig,
    ) -> MortgageMageResult<Self> {
        config.validate()?;
        Ok(Self {
            rates: RateCache::new(aggregator),
            config,
        })
    }

    pub fn config(&self) -> &RateModelConfig {
        &self.config
    }

    pub fn rates(&self) -> &RateCache<'a> {
        &self.rates
    }

    /// Representative (median-rate) financing for the request.
    pub fn financing_terms(
        &self,
        request: &FinancingRequest,
    ) -> MortgageMageResult<FinancingTerms> {
        self.quote(request).map(|q| q.terms)
    }

    /// Financing terms plus the distributions behind them.
    pub fn quote(&self, request: &FinancingRequest) -> MortgageMageResult<FinancingQuote> {
        validate_request(request)?;

        let ltv = request.loan_amount / request.property_value;
        if ltv > Decimal::ONE {
            return Err(MortgageMageError::UnreachableLtv {
                ltv,
                reason: "first-lien loan exceeds property value".into(),
            });
        }

        let first_rates = self.first_lien_distribution(ltv)?;
        let first_rate = first_rates.median();
        let requires_pmi = ltv > self.config.pmi_ltv_threshold;

        let first_lien = LoanTranche::new(
            LienPosition::First,
            request.loan_amount,
            first_rate,
            request
                .amortization_periods
                .unwrap_or(self.config.amortization_periods),
        );

        let second_amount = request
            .second_lien
            .as_ref()
            .map(|s| s.amount)
            .unwrap_or(Decimal::ZERO);
        let combined_ltv = (request.loan_amount + second_amount) / request.property_value;

        let (second_lien, second_rates) = match &request.second_lien {
            Some(second) => {
                let dist = self.second_lien_distribution(combined_ltv)?;
                let tranche = LoanTranche::new(
                    LienPosition::Second,
                    second.amount,
                    dist.median(),
                    second
                        .amortization_periods
                        .unwrap_or(self.config.second_lien_amortization_periods),
                );
                (Some(tranche), Some(dist.as_ref().clone()))
            }
            None => (None, None),
        };

        let terms = FinancingTerms {
            first_lien,
            second_lien,
            periods_per_year: self.config.periods_per_year,
            requires_pmi,
            pmi_rate: self.config.pmi_rate,
            pmi_ltv_threshold: self.config.pmi_ltv_threshold,
        };

        info!(
            ltv = %ltv,
            combined_ltv = %combined_ltv,
            first_rate = %first_rate,
            requires_pmi,
            second_lien = terms.second_lien.is_some(),
            "priced financing request"
        );

        Ok(FinancingQuote {
            terms,
            ltv,
            combined_ltv,
            first_lien_rates: first_rates.as_ref().clone(),
            second_lien_rates: second_rates,
        })
    }

    fn first_lien_distribution(&self, ltv: Rate) -> MortgageMageResult<Arc<RateDistribution>> {
        let bucket = self.rates.bucket_for(ltv)?;
        match self.rates.get_bucket(LienPosition::First, bucket) {
            Ok(dist) => Ok(dist),
            Err(MortgageMageError::NoData { .. }) if self.config.adjacent_bucket_fallback => {
                self.nearest_populated_bucket(bucket).ok_or_else(|| {
                    MortgageMageError::UnreachableLtv {
                        ltv,
                        reason: "no first-lien quotes in any LTV bucket".into(),
                    }
                })
            }
            Err(MortgageMageError::NoData { bucket, .. }) => {
                Err(MortgageMageError::UnreachableLtv {
                    ltv,
                    reason: format!("no first-lien quotes for LTV bucket {bucket}"),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Second liens never fall back: a missing bucket means the structure
    /// cannot be financed.
    fn second_lien_distribution(
        &self,
        combined_ltv: Rate,
    ) -> MortgageMageResult<Arc<RateDistribution>> {
        if combined_ltv > Decimal::ONE {
            return Err(MortgageMageError::UnreachableLtv {
                ltv: combined_ltv,
                reason: "combined loan amount exceeds property value".into(),
            });
        }
        match self.rates.get(LienPosition::Second, combined_ltv) {
            Ok(dist) => Ok(dist),
            Err(MortgageMageError::NoData { bucket, .. }) => {
                Err(MortgageMageError::UnreachableLtv {
                    ltv: combined_ltv,
                    reason: format!("no second-lien quotes for LTV bucket {bucket}"),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Closest populated first-lien bucket, preferring the lower-LTV side on
    /// ties.
    fn nearest_populated_bucket(&self, origin: LtvBucket) -> Option<Arc<RateDistribution>> {
        let width = self.rates.aggregator().config().bucket_width;
        let count = LtvBucket::count(width);
        for distance in 1..count {
            let candidates = [
                origin.index.checked_sub(distance),
                Some(origin.index + distance).filter(|i| *i < count),
            ];
            for index in candidates.into_iter().flatten() {
                let Some(bucket) = LtvBucket::at(index, width) else {
                    continue;
                };
                if let Ok(dist) = self.rates.get_bucket(LienPosition::First, bucket) {
                    debug!(from = %origin, to = %bucket, "fell back to adjacent LTV bucket");
                    return Some(dist);
                }
            }
        }
        None
    }
}

fn validate_request(request: &FinancingRequest) -> MortgageMageResult<()> {
    if request.property_value <= Decimal::ZERO {
        return Err(MortgageMageError::InvalidInput {
            field: "property_value".into(),
            reason: "Property value must be positive".into(),
        });
    }
    if request.loan_amount <= Decimal::ZERO {
        return Err(MortgageMageError::InvalidInput {
            field: "loan_amount".into(),
            reason: "Loan amount must be positive".into(),
        });
    }
    if let Some(second) = &request.second_lien {
        if second.amount <= Decimal::ZERO {
            return Err(MortgageMageError::InvalidInput {
                field: "second_lien.amount".into(),
                reason: "Second-lien amount must be positive".into(),
            });
        }
    }
    if request.amortization_periods == Some(0) {
        return Err(MortgageMageError::InvalidInput {
            field: "amortization_periods".into(),
            reason: "Amortization term must be at least one period".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregatorConfig;
    use crate::rates::{RateQuote, StaticRateSource};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn quote(ltv: Rate, lien: LienPosition, rate: Rate) -> RateQuote {
        RateQuote {
            source_id: "snapshot".into(),
            ltv,
            lien,
            rate,
            observed_at: as_of(),
        }
    }

    fn aggregator(quotes: Vec<RateQuote>) -> RateAggregator {
        RateAggregator::new(AggregatorConfig::default(), as_of())
            .unwrap()
            .with_source(StaticRateSource::new("snapshot", quotes))
    }

    fn market() -> Vec<RateQuote> {
        vec![
            quote(dec!(0.80), LienPosition::First, dec!(0.0600)),
            quote(dec!(0.80), LienPosition::First, dec!(0.0625)),
            quote(dec!(0.82), LienPosition::First, dec!(0.0650)),
            quote(dec!(0.95), LienPosition::First, dec!(0.0700)),
            quote(dec!(0.96), LienPosition::Second, dec!(0.0900)),
        ]
    }

    fn request(loan: Money, value: Money) -> FinancingRequest {
        FinancingRequest {
            loan_amount: loan,
            property_value: value,
            second_lien: None,
            amortization_periods: None,
        }
    }

    #[test]
    fn test_median_rate_and_no_pmi_at_threshold() {
        let agg = aggregator(market());
        let model = MortgageRateModel::new(&agg, RateModelConfig::default()).unwrap();
        let terms = model
            .financing_terms(&request(dec!(240000), dec!(300000)))
            .unwrap();
        assert_eq!(terms.first_lien.annual_rate, dec!(0.0625));
        assert_eq!(terms.first_lien.amortization_periods, 360);
        assert!(!terms.requires_pmi);
        assert!(terms.second_lien.is_none());
    }

    #[test]
    fn test_pmi_required_above_threshold() {
        let agg = aggregator(market());
        let model = MortgageRateModel::new(&agg, RateModelConfig::default()).unwrap();
        let terms = model
            .financing_terms(&request(dec!(285000), dec!(300000)))
            .unwrap();
        assert!(terms.requires_pmi);
        assert_eq!(terms.first_lien.annual_rate, dec!(0.0700));
    }

    #[test]
    fn test_second_lien_priced_at_combined_ltv() {
        let agg = aggregator(market());
        let model = MortgageRateModel::new(&agg, RateModelConfig::default()).unwrap();
        let mut req = request(dec!(240000), dec!(300000));
        req.second_lien = Some(SecondLienRequest {
            amount: dec!(45000),
            amortization_periods: Some(240),
        });
        let quote = model.quote(&req).unwrap();
        let second = quote.terms.second_lien.unwrap();
        assert_eq!(second.annual_rate, dec!(0.0900));
        assert_eq!(second.amortization_periods, 240);
        assert_eq!(quote.combined_ltv, dec!(0.95));
        // Piggyback structure keeps the first lien at 80%
        assert!(!quote.terms.requires_pmi);
    }

    #[test]
    fn test_second_lien_without_quotes_is_unreachable() {
        let agg = aggregator(market());
        let model = MortgageRateModel::new(&agg, RateModelConfig::default()).unwrap();
        let mut req = request(dec!(240000), dec!(300000));
        req.second_lien = Some(SecondLienRequest {
            amount: dec!(15000),
            amortization_periods: None,
        });
        let err = model.quote(&req).unwrap_err();
        assert!(matches!(err, MortgageMageError::UnreachableLtv { .. }));
    }

    #[test]
    fn test_combined_ltv_above_one_is_unreachable() {
        let agg = aggregator(market());
        let model = MortgageRateModel::new(&agg, RateModelConfig::default()).unwrap();
        let mut req = request(dec!(285000), dec!(300000));
        req.second_lien = Some(SecondLienRequest {
            amount: dec!(30000),
            amortization_periods: None,
        });
        assert!(matches!(
            model.quote(&req),
            Err(MortgageMageError::UnreachableLtv { .. })
        ));
    }

    #[test]
    fn test_missing_first_lien_bucket() {
        let agg = aggregator(market());
        let model = MortgageRateModel::new(&agg, RateModelConfig::default()).unwrap();
        let err = model
            .financing_terms(&request(dec!(150000), dec!(300000)))
            .unwrap_err();
        assert!(matches!(err, MortgageMageError::UnreachableLtv { .. }));
    }

    #[test]
    fn test_adjacent_bucket_fallback() {
        let agg = aggregator(market());
        let config = RateModelConfig {
            adjacent_bucket_fallback: true,
            ..Default::default()
        };
        let model = MortgageRateModel::new(&agg, config).unwrap();
        // 0.75 bucket is empty; nearest populated is [0.80, 0.85)
        let terms = model
            .financing_terms(&request(dec!(225000), dec!(300000)))
            .unwrap();
        assert_eq!(terms.first_lien.annual_rate, dec!(0.0625));
    }

    #[test]
    fn test_distributions_cached_per_model() {
        let agg = aggregator(market());
        let model = MortgageRateModel::new(&agg, RateModelConfig::default()).unwrap();
        model.quote(&request(dec!(240000), dec!(300000))).unwrap();
        model.quote(&request(dec!(246000), dec!(300000))).unwrap();
        assert_eq!(model.rates().len(), 1);
    }
}
