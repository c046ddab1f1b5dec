use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency amounts, always decimal.
pub type Money = Decimal;

/// Rates and ratios as fractions: 0.05 is 5%.
pub type Rate = Decimal;

/// A count of amortization or simulation periods.
pub type Periods = u32;

/// Lien position of a mortgage tranche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LienPosition {
    First,
    Second,
}

impl fmt::Display for LienPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LienPosition::First => write!(f, "first"),
            LienPosition::Second => write!(f, "second"),
        }
    }
}

/// Arithmetic a result was computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// 128-bit `rust_decimal` throughout
    Decimal,
    /// Sampled in f64, then carried through the decimal pro-forma
    Float,
}

impl Precision {
    pub fn label(self) -> &'static str {
        match self {
            Precision::Decimal => "rust_decimal_128bit",
            Precision::Float => "ieee754_f64",
        }
    }
}

/// Envelope returned by the one-call analyses: the result plus the inputs
/// it was computed from and anything the investor should look at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    /// Crate version that produced the result
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Wrap a decimal computation. Assumptions that fail to serialize are
/// recorded as `null`.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    let assumptions = serde_json::to_value(assumptions).unwrap_or_default();
    wrap_output(methodology, assumptions, warnings, elapsed_us, Precision::Decimal, result)
}

/// Wrap a result whose assumptions are already a JSON value.
pub fn wrap_output<T: Serialize>(
    methodology: &str,
    assumptions: serde_json::Value,
    warnings: Vec<String>,
    elapsed_us: u64,
    precision: Precision,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_owned(),
        assumptions,
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_owned(),
            computation_time_us: elapsed_us,
            precision: precision.label().to_owned(),
        },
    }
}
