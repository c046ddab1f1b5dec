use clap::Args;
use serde_json::Value;

use mortgage_mage_core::config::EngineConfig;
use mortgage_mage_core::financing::{FinancingRequest, MortgageRateModel};

use crate::input::deal;

/// Arguments for financing terms
#[derive(Args)]
pub struct FinancingArgs {
    /// Path to JSON financing request
    #[arg(long)]
    pub input: Option<String>,
    /// Path to the quotes file (JSON array of sources)
    #[arg(long)]
    pub quotes: String,
    /// Reference time for staleness (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<String>,
}

pub fn run_financing(
    args: FinancingArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: FinancingRequest = deal::read_input(args.input.as_deref(), "financing")?;
    let aggregator =
        deal::load_aggregator(&args.quotes, args.as_of.as_deref(), &config.aggregator)?;
    let model = MortgageRateModel::new(&aggregator, config.rate_model.clone())?;
    let quote = model.quote(&request)?;
    Ok(serde_json::json!({ "result": quote }))
}
