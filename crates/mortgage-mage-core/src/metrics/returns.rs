use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::error::MortgageMageError;
use crate::proforma::CashFlowTrajectory;
use crate::time_value::{annualize, deannualize, irr, npv};
use crate::types::{Money, Rate};
use crate::MortgageMageResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Investment returns for one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    /// Annualized IRR on equity: (1 + periodic)^ppy - 1
    pub irr: Rate,
    /// IRR per simulation period
    pub periodic_irr: Rate,
    /// First-period net cash flow / initial equity
    pub cash_on_cash_first_period: Rate,
    /// Mean net cash flow, annualized, / initial equity
    pub cash_on_cash: Rate,
    /// Mean NOI annualized (rent less operating expenses)
    pub noi: Money,
    /// Final period NOI annualized
    pub terminal_noi: Money,
    /// Annualized NOI / annualized debt service. None once all debt is gone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscr: Option<Decimal>,
    /// (Sum of net cash flows + sale proceeds) / initial equity
    pub equity_multiple: Decimal,
    /// NPV of the equity cash flows at the hurdle rate
    pub npv_at_hurdle: Money,
    pub terminal_sale_proceeds: Money,
    /// Annual hurdle used for acceptability
    pub hurdle_rate: Rate,
    /// IRR meets or beats the hurdle
    pub acceptable: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute return metrics for a simulated trajectory against an annual
/// hurdle rate.
///
/// Averages are taken over the periods actually simulated, so they do not
/// depend on period order. Fails with `NoConvergence` when the equity cash
/// flows have no IRR inside the configured bracket.
pub fn compute_metrics(
    trajectory: &CashFlowTrajectory,
    hurdle: Rate,
    config: &MetricsConfig,
) -> MortgageMageResult<MetricsResult> {
    if trajectory.periods.is_empty() {
        return Err(MortgageMageError::InvalidInput {
            field: "trajectory".into(),
            reason: "Trajectory has no periods".into(),
        });
    }
    if trajectory.initial_equity <= Decimal::ZERO {
        return Err(MortgageMageError::InvalidInput {
            field: "initial_equity".into(),
            reason: "Initial equity must be positive".into(),
        });
    }
    if trajectory.periods_per_year == 0 {
        return Err(MortgageMageError::InvalidInput {
            field: "periods_per_year".into(),
            reason: "Periods per year must be positive".into(),
        });
    }

    let ppy = Decimal::from(trajectory.periods_per_year);
    let n = Decimal::from(trajectory.periods.len() as u64);
    let equity = trajectory.initial_equity;

    let total_net: Money = trajectory.periods.iter().map(|p| p.net_cash_flow).sum();
    let total_noi: Money = trajectory.periods.iter().map(|p| p.noi()).sum();
    let total_debt_service: Money = trajectory.periods.iter().map(|p| p.debt_service).sum();

    let first = trajectory
        .periods
        .iter()
        .min_by_key(|p| p.period)
        .map(|p| p.net_cash_flow)
        .unwrap_or(Decimal::ZERO);
    let last_noi = trajectory
        .final_period()
        .map(|p| p.noi())
        .unwrap_or(Decimal::ZERO);

    let cash_on_cash_first_period = first / equity;
    let cash_on_cash = total_net / n * ppy / equity;
    let noi = total_noi / n * ppy;
    let terminal_noi = last_noi * ppy;
    let dscr = if total_debt_service.is_zero() {
        None
    } else {
        Some(total_noi / total_debt_service)
    };

    let sale = trajectory.terminal_sale_proceeds();
    let equity_multiple = (total_net + sale) / equity;

    let flows = trajectory.equity_cash_flows();
    let periodic_irr = irr(&flows, config)?;
    let annual_irr = annualize(periodic_irr, trajectory.periods_per_year)?;

    let periodic_hurdle = deannualize(hurdle, trajectory.periods_per_year)?;
    let npv_at_hurdle = npv(periodic_hurdle, &flows)?;

    Ok(MetricsResult {
        irr: annual_irr,
        periodic_irr,
        cash_on_cash_first_period,
        cash_on_cash,
        noi,
        terminal_noi,
        dscr,
        equity_multiple,
        npv_at_hurdle,
        terminal_sale_proceeds: sale,
        hurdle_rate: hurdle,
        acceptable: annual_irr >= hurdle,
    })
}
