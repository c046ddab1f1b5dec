use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mortgage_mage_core::analysis::{analyze_deal, DealInput};
use mortgage_mage_core::config::EngineConfig;

use crate::input::deal::{self, DealFile};

/// Arguments for deal analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON deal file
    #[arg(long)]
    pub input: Option<String>,
    /// Price financing from this quotes file instead of the deal's terms
    #[arg(long)]
    pub quotes: Option<String>,
    /// Reference time for staleness (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<String>,
    /// Annual hurdle rate; overrides the deal file
    #[arg(long)]
    pub hurdle: Option<Decimal>,
}

pub fn run_analyze(
    args: AnalyzeArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let deal: DealFile = deal::read_input(args.input.as_deref(), "analysis")?;
    let (financing, _) =
        deal::resolve_financing(&deal, args.quotes.as_deref(), args.as_of.as_deref(), config)?;
    let hurdle_rate = args
        .hurdle
        .or(deal.hurdle_rate)
        .ok_or("hurdle rate required: --hurdle or \"hurdle_rate\" in the deal file")?;

    let input = DealInput {
        scenario: deal.scenario,
        financing,
        hurdle_rate,
    };
    let result = analyze_deal(&input, &config.metrics)?;
    Ok(serde_json::to_value(result)?)
}
