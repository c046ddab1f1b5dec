use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use statrs::distribution::{LogNormal, Normal, Triangular, Uniform};

use crate::error::MortgageMageError;
use crate::rates::RateDistribution;
use crate::MortgageMageResult;

/// Rejection attempts before a truncated draw is clamped into its bounds.
const MAX_REJECTIONS: u32 = 1_000;

/// Source of one stochastic input.
pub trait Sampler: Send + Sync {
    fn sample(&self, rng: &mut StdRng) -> f64;
}

// ---------------------------------------------------------------------------
// Parametric distributions
// ---------------------------------------------------------------------------

/// Probability distribution for a stochastic input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McDistribution {
    Normal {
        mean: f64,
        std_dev: f64,
    },
    LogNormal {
        mu: f64,
        sigma: f64,
    },
    Triangular {
        min: f64,
        mode: f64,
        max: f64,
    },
    Uniform {
        min: f64,
        max: f64,
    },
    /// Normal restricted to [lower, upper]; either bound may be open.
    TruncatedNormal {
        mean: f64,
        std_dev: f64,
        #[serde(default)]
        lower: Option<f64>,
        #[serde(default)]
        upper: Option<f64>,
    },
    Fixed {
        value: f64,
    },
}

impl McDistribution {
    /// Validate the parameters and build a sampler for them.
    pub fn sampler(&self) -> MortgageMageResult<DistributionSampler> {
        let sampler = match self {
            McDistribution::Normal { mean, std_dev } => {
                DistributionSampler::Normal(normal(*mean, *std_dev)?)
            }
            McDistribution::LogNormal { mu, sigma } => {
                let ln = LogNormal::new(*mu, *sigma).map_err(|e| invalid(format!(
                    "Invalid LogNormal parameters: {e}"
                )))?;
                DistributionSampler::LogNormal(ln)
            }
            McDistribution::Triangular { min, mode, max } => {
                let t = Triangular::new(*min, *max, *mode).map_err(|e| {
                    invalid(format!("Invalid Triangular parameters: {e}"))
                })?;
                DistributionSampler::Triangular(t)
            }
            McDistribution::Uniform { min, max } => {
                let u = Uniform::new(*min, *max)
                    .map_err(|e| invalid(format!("Invalid Uniform parameters: {e}")))?;
                DistributionSampler::Uniform(u)
            }
            McDistribution::TruncatedNormal {
                mean,
                std_dev,
                lower,
                upper,
            } => {
                if let (Some(lo), Some(hi)) = (lower, upper) {
                    if lo >= hi {
                        return Err(invalid(format!(
                            "Truncation bounds must satisfy lower < upper (got {lo} >= {hi})"
                        )));
                    }
                }
                DistributionSampler::TruncatedNormal {
                    normal: normal(*mean, *std_dev)?,
                    lower: lower.unwrap_or(f64::NEG_INFINITY),
                    upper: upper.unwrap_or(f64::INFINITY),
                }
            }
            McDistribution::Fixed { value } => {
                if !value.is_finite() {
                    return Err(invalid("Fixed value must be finite".into()));
                }
                DistributionSampler::Fixed(*value)
            }
        };
        Ok(sampler)
    }
}

fn normal(mean: f64, std_dev: f64) -> MortgageMageResult<Normal> {
    Normal::new(mean, std_dev).map_err(|e| invalid(format!("Invalid Normal parameters: {e}")))
}

fn invalid(reason: String) -> MortgageMageError {
    MortgageMageError::InvalidInput {
        field: "distribution".into(),
        reason,
    }
}

/// Validated distribution, ready to sample.
#[derive(Debug, Clone)]
pub enum DistributionSampler {
    Normal(Normal),
    LogNormal(LogNormal),
    Triangular(Triangular),
    Uniform(Uniform),
    TruncatedNormal {
        normal: Normal,
        lower: f64,
        upper: f64,
    },
    Fixed(f64),
}

impl Sampler for DistributionSampler {
    fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            DistributionSampler::Normal(d) => rng.sample(d),
            DistributionSampler::LogNormal(d) => rng.sample(d),
            DistributionSampler::Triangular(d) => rng.sample(d),
            DistributionSampler::Uniform(d) => rng.sample(d),
            DistributionSampler::TruncatedNormal {
                normal,
                lower,
                upper,
            } => {
                let mut x = rng.sample(normal);
                for _ in 0..MAX_REJECTIONS {
                    if x >= *lower && x <= *upper {
                        return x;
                    }
                    x = rng.sample(normal);
                }
                x.clamp(*lower, *upper)
            }
            DistributionSampler::Fixed(v) => *v,
        }
    }
}

// ---------------------------------------------------------------------------
// Empirical rates
// ---------------------------------------------------------------------------

/// Draws uniformly from the quotes behind a rate distribution.
#[derive(Debug, Clone)]
pub struct EmpiricalRateSampler {
    rates: Vec<f64>,
}

impl EmpiricalRateSampler {
    pub fn new(distribution: &RateDistribution) -> MortgageMageResult<Self> {
        let rates: Vec<f64> = distribution
            .rates()
            .iter()
            .filter_map(|r| r.to_f64())
            .collect();
        if rates.is_empty() {
            return Err(MortgageMageError::InvalidInput {
                field: "interest_rate".into(),
                reason: "Empirical sampler needs at least one quote".into(),
            });
        }
        Ok(Self { rates })
    }
}

impl Sampler for EmpiricalRateSampler {
    fn sample(&self, rng: &mut StdRng) -> f64 {
        self.rates[rng.gen_range(0..self.rates.len())]
    }
}

// ---------------------------------------------------------------------------
// Sampler set
// ---------------------------------------------------------------------------

/// One sampler per stochastic input of a draw.
pub struct Samplers {
    /// Rent per period
    pub rental_revenue: Box<dyn Sampler>,
    /// Annual property tax rate
    pub property_tax_rate: Box<dyn Sampler>,
    /// Annual appreciation rate
    pub appreciation: Box<dyn Sampler>,
    /// Annual first-lien interest rate
    pub interest_rate: Box<dyn Sampler>,
}

/// Serializable description of the stochastic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StochasticInputs {
    pub rental_revenue: McDistribution,
    pub property_tax_rate: McDistribution,
    pub appreciation: McDistribution,
    /// When absent, rates are drawn from the empirical quote distribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<McDistribution>,
}

impl StochasticInputs {
    pub fn samplers(&self, empirical: Option<&RateDistribution>) -> MortgageMageResult<Samplers> {
        let interest_rate: Box<dyn Sampler> = match (&self.interest_rate, empirical) {
            (Some(dist), _) => Box::new(dist.sampler()?),
            (None, Some(rates)) => Box::new(EmpiricalRateSampler::new(rates)?),
            (None, None) => {
                return Err(MortgageMageError::InvalidInput {
                    field: "interest_rate".into(),
                    reason: "No interest rate distribution and no quotes to sample from".into(),
                })
            }
        };
        Ok(Samplers {
            rental_revenue: Box::new(self.rental_revenue.sampler()?),
            property_tax_rate: Box::new(self.property_tax_rate.sampler()?),
            appreciation: Box::new(self.appreciation.sampler()?),
            interest_rate,
        })
    }
}
