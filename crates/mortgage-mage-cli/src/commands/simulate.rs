use clap::Args;
use serde_json::Value;

use mortgage_mage_core::config::EngineConfig;
use mortgage_mage_core::proforma::simulate;

use crate::input::deal::{self, DealFile};

/// Arguments for the period-by-period projection
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON deal file
    #[arg(long)]
    pub input: Option<String>,
    /// Price financing from this quotes file instead of the deal's terms
    #[arg(long)]
    pub quotes: Option<String>,
    /// Reference time for staleness (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<String>,
}

/// Emits the per-period records as an array so table and CSV output show
/// one row per period.
pub fn run_simulate(
    args: SimulateArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let deal: DealFile = deal::read_input(args.input.as_deref(), "simulation")?;
    let (terms, _) =
        deal::resolve_financing(&deal, args.quotes.as_deref(), args.as_of.as_deref(), config)?;
    let trajectory = simulate(&deal.scenario, &terms)?;
    Ok(serde_json::to_value(trajectory.periods)?)
}
