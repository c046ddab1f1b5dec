use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use mortgage_mage_core::config::EngineConfig;
use mortgage_mage_core::LienPosition;

use crate::input::deal;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LienArg {
    First,
    Second,
}

impl From<LienArg> for LienPosition {
    fn from(lien: LienArg) -> Self {
        match lien {
            LienArg::First => LienPosition::First,
            LienArg::Second => LienPosition::Second,
        }
    }
}

/// Arguments for rate aggregation
#[derive(Args)]
pub struct RatesArgs {
    /// Path to the quotes file (JSON array of sources)
    #[arg(long)]
    pub quotes: String,
    /// Lien position
    #[arg(long, default_value = "first")]
    pub lien: LienArg,
    /// Loan-to-value to look up, e.g. 0.8
    #[arg(long, required_unless_present = "sweep")]
    pub ltv: Option<Decimal>,
    /// Report the median rate of every LTV bucket instead
    #[arg(long)]
    pub sweep: bool,
    /// Reference time for staleness (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<String>,
}

pub fn run_rates(
    args: RatesArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let aggregator =
        deal::load_aggregator(&args.quotes, args.as_of.as_deref(), &config.aggregator)?;
    let lien = LienPosition::from(args.lien);

    if args.sweep {
        return Ok(serde_json::to_value(aggregator.ltv_sweep(lien))?);
    }

    let ltv = args.ltv.ok_or("--ltv is required without --sweep")?;
    let dist = aggregator.get_rate_distribution(lien, ltv)?;
    Ok(json!({
        "result": {
            "lien": dist.lien,
            "bucket": dist.bucket.to_string(),
            "quote_count": dist.len(),
            "source_count": dist.source_count,
            "median_rate": dist.median(),
            "mean_rate": dist.mean(),
            "min_rate": dist.min(),
            "max_rate": dist.max(),
            "p25_rate": dist.percentile(Decimal::from(25)),
            "p75_rate": dist.percentile(Decimal::from(75)),
        }
    }))
}
