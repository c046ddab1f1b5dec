//! One-call analyses wrapped in the `ComputationOutput` envelope, with
//! warnings for conditions an investor should look at.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::MetricsConfig;
use crate::financing::FinancingTerms;
use crate::metrics::{compute_metrics, MetricsResult};
use crate::proforma::{simulate, CashFlowTrajectory, PropertyScenario};
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::MortgageMageResult;

#[cfg(feature = "monte_carlo")]
use crate::config::EngineConfig;
#[cfg(feature = "monte_carlo")]
use crate::monte_carlo::{run_monte_carlo, Samplers, ScenarioTemplate, StochasticResult};
#[cfg(feature = "monte_carlo")]
use crate::types::{wrap_output, Precision};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A deterministic deal: scenario, financing and the investor's hurdle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealInput {
    pub scenario: PropertyScenario,
    pub financing: FinancingTerms,
    /// Annual hurdle rate
    pub hurdle_rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAnalysis {
    pub metrics: MetricsResult,
    /// First period without PMI, when PMI was required and burned off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmi_ends_period: Option<u32>,
    pub total_pmi_paid: Decimal,
    pub trajectory: CashFlowTrajectory,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate the deal and compute its metrics.
pub fn analyze_deal(
    input: &DealInput,
    config: &MetricsConfig,
) -> MortgageMageResult<ComputationOutput<DealAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let trajectory = simulate(&input.scenario, &input.financing)?;
    let metrics = compute_metrics(&trajectory, input.hurdle_rate, config)?;

    let total_pmi_paid: Decimal = trajectory.periods.iter().map(|p| p.pmi).sum();
    let pmi_ends_period = if input.financing.requires_pmi {
        trajectory
            .periods
            .iter()
            .find(|p| p.pmi.is_zero())
            .map(|p| p.period)
    } else {
        None
    };

    deal_warnings(input, &trajectory, &metrics, pmi_ends_period, &mut warnings);

    let output = DealAnalysis {
        metrics,
        pmi_ends_period,
        total_pmi_paid,
        trajectory,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Leveraged Rental Pro-Forma (Levered Equity IRR)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Run the stochastic driver and wrap its result with assumptions and
/// warnings.
#[cfg(feature = "monte_carlo")]
pub fn analyze_monte_carlo(
    template: &ScenarioTemplate,
    draws: u32,
    samplers: &Samplers,
    config: &EngineConfig,
) -> MortgageMageResult<ComputationOutput<StochasticResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = run_monte_carlo(template, draws, samplers, config)?;

    if result.draws_skipped > 0 {
        warnings.push(format!(
            "{} of {} draws skipped as unusable scenarios",
            result.draws_skipped, result.draws_requested
        ));
    }
    if result.acceptance_probability < 0.5 {
        warnings.push(format!(
            "IRR meets the {:.2}% hurdle in only {:.1}% of draws",
            template.hurdle_rate * dec!(100),
            result.acceptance_probability * 100.0
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "template": template,
        "draws": draws,
        "seed": result.seed,
        "monte_carlo": config.monte_carlo,
    });
    Ok(wrap_output(
        "Monte Carlo Pro-Forma (Per-Draw Seeded)",
        assumptions,
        warnings,
        elapsed,
        Precision::Float,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

fn deal_warnings(
    input: &DealInput,
    trajectory: &CashFlowTrajectory,
    metrics: &MetricsResult,
    pmi_ends_period: Option<u32>,
    warnings: &mut Vec<String>,
) {
    let scenario = &input.scenario;
    let financing = &input.financing;

    let funded = financing.total_loan_amount() + scenario.down_payment;
    if funded != scenario.purchase_price {
        warnings.push(format!(
            "Loans plus down payment ({funded}) do not equal the purchase price ({})",
            scenario.purchase_price
        ));
    }

    if financing.requires_pmi {
        match pmi_ends_period {
            Some(period) => warnings.push(format!(
                "PMI of {:.2} per period until period {period}",
                financing.pmi_payment()
            )),
            None => warnings.push(format!(
                "PMI of {:.2} per period for the whole holding period",
                financing.pmi_payment()
            )),
        }
    }

    let negative = trajectory
        .periods
        .iter()
        .filter(|p| p.net_cash_flow < Decimal::ZERO)
        .count();
    if negative > 0 {
        warnings.push(format!(
            "Net cash flow is negative in {negative} of {} periods",
            trajectory.periods.len()
        ));
    }

    if trajectory.paid_off_early {
        warnings.push(format!(
            "Loans retire in period {} before the {}-period holding period ends",
            trajectory.periods_simulated(),
            trajectory.requested_periods
        ));
    }

    if let Some(dscr) = metrics.dscr {
        if dscr < dec!(1.2) {
            warnings.push(format!("DSCR of {dscr:.2} is below 1.20x"));
        }
    }

    if !metrics.acceptable {
        warnings.push(format!(
            "IRR of {:.2}% is below the {:.2}% hurdle",
            metrics.irr * dec!(100),
            input.hurdle_rate * dec!(100)
        ));
    }
}
