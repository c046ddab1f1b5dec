//! Engine configuration.
//!
//! Every section deserialises with defaults, so a config file only needs to
//! name the values it overrides. Tuning parameters the model does not fix
//! contractually (bucket width, staleness window, PMI policy, IRR bracket)
//! live here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MortgageMageError;
use crate::types::{Periods, Rate};
use crate::MortgageMageResult;

/// Top-level configuration for a run of the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub aggregator: AggregatorConfig,
    pub rate_model: RateModelConfig,
    pub metrics: MetricsConfig,
    pub monte_carlo: MonteCarloConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> MortgageMageResult<()> {
        self.aggregator.validate()?;
        self.rate_model.validate()?;
        self.metrics.validate()?;
        self.monte_carlo.validate()
    }
}

// ---------------------------------------------------------------------------
// Rate aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Width of each LTV bucket. Must divide [0, 1] into whole buckets.
    pub bucket_width: Rate,
    /// Quotes observed more than this many days before `as_of` are discarded.
    pub staleness_days: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            bucket_width: dec!(0.05),
            staleness_days: 30,
        }
    }
}

impl AggregatorConfig {
    pub fn validate(&self) -> MortgageMageResult<()> {
        if self.bucket_width <= Decimal::ZERO || self.bucket_width > Decimal::ONE {
            return Err(MortgageMageError::InvalidInput {
                field: "aggregator.bucket_width".into(),
                reason: "Bucket width must be in (0, 1]".into(),
            });
        }
        if !(Decimal::ONE % self.bucket_width).is_zero() {
            return Err(MortgageMageError::InvalidInput {
                field: "aggregator.bucket_width".into(),
                reason: "Bucket width must divide 1 evenly".into(),
            });
        }
        if self.staleness_days < 0 {
            return Err(MortgageMageError::InvalidInput {
                field: "aggregator.staleness_days".into(),
                reason: "Staleness window cannot be negative".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mortgage rate model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateModelConfig {
    /// PMI is required when first-lien LTV strictly exceeds this value.
    pub pmi_ltv_threshold: Rate,
    /// Annual PMI premium as a fraction of the original first-lien amount.
    pub pmi_rate: Rate,
    /// Default first-lien amortization term in periods.
    pub amortization_periods: Periods,
    /// Default second-lien amortization term in periods.
    pub second_lien_amortization_periods: Periods,
    pub periods_per_year: u32,
    /// Search neighbouring buckets when the first-lien bucket is empty.
    /// Never applies to second liens.
    pub adjacent_bucket_fallback: bool,
}

impl Default for RateModelConfig {
    fn default() -> Self {
        Self {
            pmi_ltv_threshold: dec!(0.80),
            pmi_rate: dec!(0.004),
            amortization_periods: 360,
            second_lien_amortization_periods: 360,
            periods_per_year: 12,
            adjacent_bucket_fallback: false,
        }
    }
}

impl RateModelConfig {
    pub fn validate(&self) -> MortgageMageResult<()> {
        if self.pmi_ltv_threshold <= Decimal::ZERO || self.pmi_ltv_threshold > Decimal::ONE {
            return Err(MortgageMageError::InvalidInput {
                field: "rate_model.pmi_ltv_threshold".into(),
                reason: "PMI threshold must be in (0, 1]".into(),
            });
        }
        if self.pmi_rate < Decimal::ZERO || self.pmi_rate >= Decimal::ONE {
            return Err(MortgageMageError::InvalidInput {
                field: "rate_model.pmi_rate".into(),
                reason: "PMI rate must be in [0, 1)".into(),
            });
        }
        if self.amortization_periods == 0 || self.second_lien_amortization_periods == 0 {
            return Err(MortgageMageError::InvalidInput {
                field: "rate_model.amortization_periods".into(),
                reason: "Amortization term must be at least one period".into(),
            });
        }
        if self.periods_per_year == 0 {
            return Err(MortgageMageError::InvalidInput {
                field: "rate_model.periods_per_year".into(),
                reason: "Periods per year must be positive".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Lower end of the per-period IRR search bracket.
    pub irr_lower_bound: f64,
    /// Upper end of the per-period IRR search bracket.
    pub irr_upper_bound: f64,
    pub irr_tolerance: f64,
    pub irr_max_iterations: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            irr_lower_bound: -0.5,
            irr_upper_bound: 1.0,
            irr_tolerance: 1e-10,
            irr_max_iterations: 200,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> MortgageMageResult<()> {
        if self.irr_lower_bound <= -1.0 || self.irr_lower_bound >= self.irr_upper_bound {
            return Err(MortgageMageError::InvalidInput {
                field: "metrics.irr_lower_bound".into(),
                reason: "IRR bracket must satisfy -1 < lower < upper".into(),
            });
        }
        if self.irr_tolerance <= 0.0 || self.irr_max_iterations == 0 {
            return Err(MortgageMageError::InvalidInput {
                field: "metrics.irr_tolerance".into(),
                reason: "IRR tolerance and iteration cap must be positive".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Monte Carlo
// ---------------------------------------------------------------------------

/// How often the appreciation input is redrawn within one Monte Carlo draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppreciationResample {
    /// One annual appreciation rate for the whole holding period.
    #[default]
    PerDraw,
    /// A fresh annual rate for each year of the holding period.
    PerYear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Seed for reproducible runs. Drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Largest tolerated fraction of skipped draws.
    pub max_failure_ratio: f64,
    /// Wall-clock bound on the whole run.
    pub timeout_ms: Option<u64>,
    pub appreciation_resample: AppreciationResample,
    /// Retain every per-draw metrics record in the result.
    pub keep_draws: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_failure_ratio: 0.10,
            timeout_ms: None,
            appreciation_resample: AppreciationResample::PerDraw,
            keep_draws: true,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> MortgageMageResult<()> {
        if !(0.0..=1.0).contains(&self.max_failure_ratio) {
            return Err(MortgageMageError::InvalidInput {
                field: "monte_carlo.max_failure_ratio".into(),
                reason: "Failure ratio must be in [0, 1]".into(),
            });
        }
        Ok(())
    }
}
