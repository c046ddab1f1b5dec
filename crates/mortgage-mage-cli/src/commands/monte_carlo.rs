use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use mortgage_mage_core::analysis::analyze_monte_carlo;
use mortgage_mage_core::config::EngineConfig;
use mortgage_mage_core::monte_carlo::{ScenarioTemplate, StochasticInputs};

use crate::input::deal::{self, DealFile};

/// Arguments for the Monte Carlo run
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON input: a deal file plus a "stochastic" section
    #[arg(long)]
    pub input: Option<String>,
    /// Quotes file; required when interest rates are drawn from quotes
    #[arg(long)]
    pub quotes: Option<String>,
    /// Reference time for staleness (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<String>,
    /// Number of draws
    #[arg(long, default_value_t = 10_000)]
    pub draws: u32,
    /// Seed for a reproducible run; overrides the config file
    #[arg(long)]
    pub seed: Option<u64>,
    /// Annual hurdle rate; overrides the input file
    #[arg(long)]
    pub hurdle: Option<Decimal>,
    /// Leave per-draw records out of the output
    #[arg(long)]
    pub summary_only: bool,
}

#[derive(Deserialize)]
struct MonteCarloFile {
    #[serde(flatten)]
    deal: DealFile,
    stochastic: StochasticInputs,
}

pub fn run_monte_carlo(
    args: MonteCarloArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mc: MonteCarloFile = deal::read_input(args.input.as_deref(), "Monte Carlo")?;
    let (financing, empirical) =
        deal::resolve_financing(&mc.deal, args.quotes.as_deref(), args.as_of.as_deref(), config)?;
    let samplers = mc.stochastic.samplers(empirical.as_ref())?;

    let hurdle_rate = args
        .hurdle
        .or(mc.deal.hurdle_rate)
        .ok_or("hurdle rate required: --hurdle or \"hurdle_rate\" in the input file")?;

    let mut config = config.clone();
    if args.seed.is_some() {
        config.monte_carlo.seed = args.seed;
    }
    if args.summary_only {
        config.monte_carlo.keep_draws = false;
    }

    let template = ScenarioTemplate {
        scenario: mc.deal.scenario,
        financing,
        hurdle_rate,
    };
    let result = analyze_monte_carlo(&template, args.draws, &samplers, &config)?;
    Ok(serde_json::to_value(result)?)
}
