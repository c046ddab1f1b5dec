use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MortgageMageError;
use crate::financing::{FinancingTerms, LoanTranche};
use crate::proforma::scenario::PropertyScenario;
use crate::types::{Money, Periods, Rate};
use crate::MortgageMageResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One period of the pro-forma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodCashFlow {
    /// 1-based period index
    pub period: Periods,
    pub gross_rental_income: Money,
    pub operating_expenses: Money,
    pub interest: Money,
    pub principal: Money,
    /// interest + principal across all liens
    pub debt_service: Money,
    /// Zero once the first lien drops to the PMI threshold
    pub pmi: Money,
    pub property_tax: Money,
    pub insurance: Money,
    pub net_cash_flow: Money,
    /// Outstanding balance across all liens at period end
    pub ending_loan_balance: Money,
    pub ending_first_lien_balance: Money,
    pub ending_property_value: Money,
}

impl PeriodCashFlow {
    /// Net operating income for the period: rent less operating expenses,
    /// before debt service and tax.
    pub fn noi(&self) -> Money {
        self.gross_rental_income - self.operating_expenses
    }
}

/// Period-by-period projection of one scenario under one set of financing
/// terms. Produced by [`simulate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowTrajectory {
    pub periods: Vec<PeriodCashFlow>,
    /// Holding period the scenario asked for
    pub requested_periods: Periods,
    pub periods_per_year: u32,
    /// Loans retired before the holding period ended
    pub paid_off_early: bool,
    pub purchase_price: Money,
    pub initial_equity: Money,
    pub disposition_cost_rate: Rate,
}

impl CashFlowTrajectory {
    pub fn periods_simulated(&self) -> Periods {
        self.periods.len() as Periods
    }

    /// Record with the highest period index.
    pub fn final_period(&self) -> Option<&PeriodCashFlow> {
        self.periods.iter().max_by_key(|p| p.period)
    }

    pub fn ending_loan_balance(&self) -> Money {
        self.final_period()
            .map(|p| p.ending_loan_balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn ending_property_value(&self) -> Money {
        self.final_period()
            .map(|p| p.ending_property_value)
            .unwrap_or(self.purchase_price)
    }

    pub fn disposition_costs(&self) -> Money {
        self.ending_property_value() * self.disposition_cost_rate
    }

    /// Sale price less remaining loan balance less selling costs.
    pub fn terminal_sale_proceeds(&self) -> Money {
        self.ending_property_value() - self.ending_loan_balance() - self.disposition_costs()
    }

    pub fn total_net_cash_flow(&self) -> Money {
        self.periods.iter().map(|p| p.net_cash_flow).sum()
    }

    /// Equity-holder cash flows: the initial investment at t=0, each
    /// period's net cash flow in period order, and sale proceeds added to the
    /// final period.
    pub fn equity_cash_flows(&self) -> Vec<Money> {
        let mut periods: Vec<&PeriodCashFlow> = self.periods.iter().collect();
        periods.sort_by_key(|p| p.period);

        let mut flows = Vec::with_capacity(periods.len() + 1);
        flows.push(-self.initial_equity);
        flows.extend(periods.iter().map(|p| p.net_cash_flow));
        if let Some(last) = flows.last_mut() {
            *last += self.terminal_sale_proceeds();
        }
        flows
    }
}

// ---------------------------------------------------------------------------
// Loan state
// ---------------------------------------------------------------------------

struct TrancheState {
    periodic_rate: Rate,
    payment: Money,
    balance: Money,
    term: Periods,
    payments_made: Periods,
}

struct PeriodDebtService {
    interest: Money,
    principal: Money,
}

impl TrancheState {
    fn open(tranche: &LoanTranche, periods_per_year: u32) -> MortgageMageResult<Self> {
        Ok(Self {
            periodic_rate: tranche.periodic_rate(periods_per_year),
            payment: tranche.payment(periods_per_year)?,
            balance: tranche.amount,
            term: tranche.amortization_periods,
            payments_made: 0,
        })
    }

    fn step(&mut self, field: &str) -> MortgageMageResult<PeriodDebtService> {
        if self.balance.is_zero() {
            return Ok(PeriodDebtService {
                interest: Decimal::ZERO,
                principal: Decimal::ZERO,
            });
        }

        let interest = self.balance * self.periodic_rate;
        if self.payment < interest {
            return Err(MortgageMageError::invalid_scenario(
                field,
                format!(
                    "negative amortization: scheduled payment {} does not cover interest {}",
                    self.payment.round_dp(2),
                    interest.round_dp(2)
                ),
            ));
        }

        self.payments_made += 1;
        let scheduled_principal = self.payment - interest;
        // The final scheduled payment retires whatever residual is left.
        let principal = if self.payments_made >= self.term || scheduled_principal >= self.balance {
            self.balance
        } else {
            scheduled_principal
        };
        self.balance -= principal;

        Ok(PeriodDebtService {
            interest,
            principal,
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scenario and financing must step on the same period grid.
pub fn check_period_alignment(
    scenario: &PropertyScenario,
    terms: &FinancingTerms,
) -> MortgageMageResult<()> {
    if scenario.periods_per_year != terms.periods_per_year {
        return Err(MortgageMageError::invalid_scenario(
            "periods_per_year",
            format!(
                "scenario uses {} periods per year but financing uses {}",
                scenario.periods_per_year, terms.periods_per_year
            ),
        ));
    }
    Ok(())
}

/// Project a scenario period by period under the given financing.
///
/// Runs until the holding period ends or every lien is paid off, whichever
/// comes first. Scenario configuration problems, including a scheduled
/// payment that does not cover interest, fail with `InvalidScenario`.
pub fn simulate(
    scenario: &PropertyScenario,
    terms: &FinancingTerms,
) -> MortgageMageResult<CashFlowTrajectory> {
    scenario.validate()?;
    terms.validate()?;

    check_period_alignment(scenario, terms)?;

    let ppy = Decimal::from(scenario.periods_per_year);
    let mut first = TrancheState::open(&terms.first_lien, terms.periods_per_year)?;
    let mut second = terms
        .second_lien
        .as_ref()
        .map(|t| TrancheState::open(t, terms.periods_per_year))
        .transpose()?;

    let rent = scenario.rental_revenue;
    let operating_expenses = scenario.operating_expenses.for_rent(rent);
    let property_tax = scenario.property_tax_per_period();
    let insurance = scenario.insurance_per_period();
    let pmi_payment = terms.pmi_payment();

    let mut property_value = scenario.purchase_price;
    let mut pmi_active = terms.requires_pmi;
    let mut periods = Vec::with_capacity(scenario.holding_period as usize);
    let mut paid_off_early = false;

    for index in 0..scenario.holding_period as usize {
        // PMI is judged on the opening first-lien balance against the value
        // at origination and never comes back once it stops.
        if pmi_active && first.balance / scenario.purchase_price <= terms.pmi_ltv_threshold {
            pmi_active = false;
        }
        let pmi = if pmi_active { pmi_payment } else { Decimal::ZERO };

        let first_ds = first.step("first_lien")?;
        let second_ds = match second.as_mut() {
            Some(state) => state.step("second_lien")?,
            None => PeriodDebtService {
                interest: Decimal::ZERO,
                principal: Decimal::ZERO,
            },
        };

        let growth = Decimal::ONE + scenario.appreciation_for(index) / ppy;
        property_value = property_value.checked_mul(growth).ok_or_else(|| {
            MortgageMageError::invalid_scenario(
                "appreciation_rate",
                format!("property value overflows after {} periods", index + 1),
            )
        })?;

        let interest = first_ds.interest + second_ds.interest;
        let principal = first_ds.principal + second_ds.principal;
        let debt_service = interest + principal;
        let net_cash_flow =
            rent - operating_expenses - property_tax - insurance - debt_service - pmi;
        let ending_loan_balance =
            first.balance + second.as_ref().map(|s| s.balance).unwrap_or(Decimal::ZERO);

        periods.push(PeriodCashFlow {
            period: index as Periods + 1,
            gross_rental_income: rent,
            operating_expenses,
            interest,
            principal,
            debt_service,
            pmi,
            property_tax,
            insurance,
            net_cash_flow,
            ending_loan_balance,
            ending_first_lien_balance: first.balance,
            ending_property_value: property_value,
        });

        if ending_loan_balance.is_zero() {
            paid_off_early = index + 1 < scenario.holding_period as usize;
            break;
        }
    }

    debug!(
        requested = scenario.holding_period,
        simulated = periods.len(),
        paid_off_early,
        "simulated pro-forma"
    );

    Ok(CashFlowTrajectory {
        periods,
        requested_periods: scenario.holding_period,
        periods_per_year: scenario.periods_per_year,
        paid_off_early,
        purchase_price: scenario.purchase_price,
        initial_equity: scenario.initial_equity(),
        disposition_cost_rate: scenario.disposition_cost_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proforma::scenario::OperatingExpenses;
    use crate::time_value::level_payment;
    use crate::types::LienPosition;
    use rust_decimal_macros::dec;

    fn scenario(holding: Periods) -> PropertyScenario {
        PropertyScenario {
            purchase_price: dec!(300000),
            down_payment: dec!(60000),
            closing_costs: dec!(0),
            holding_period: holding,
            periods_per_year: 12,
            rental_revenue: dec!(2200),
            property_tax_rate: dec!(0),
            tax_exemption: dec!(0),
            annual_insurance: dec!(0),
            appreciation_rate: dec!(0.03),
            appreciation_path: None,
            operating_expenses: OperatingExpenses::Fixed { amount: dec!(500) },
            disposition_cost_rate: dec!(0.06),
        }
    }

    fn terms(amount: Money, rate: Rate, requires_pmi: bool) -> FinancingTerms {
        FinancingTerms {
            first_lien: LoanTranche::new(LienPosition::First, amount, rate, 360),
            second_lien: None,
            periods_per_year: 12,
            requires_pmi,
            pmi_rate: dec!(0.004),
            pmi_ltv_threshold: dec!(0.80),
        }
    }

    #[test]
    fn test_full_term_amortizes_to_zero() {
        let t = terms(dec!(240000), dec!(0.06), false);
        let traj = simulate(&scenario(360), &t).unwrap();
        assert_eq!(traj.periods_simulated(), 360);
        assert!(traj.ending_loan_balance().abs() <= dec!(0.01));

        // The final payment differs from the level payment by under a cent
        let pmt = level_payment(dec!(240000), dec!(0.005), 360).unwrap();
        let last = traj.periods.last().unwrap();
        assert!((last.debt_service - pmt).abs() <= dec!(0.01));
        assert!(!traj.paid_off_early);
    }

    #[test]
    fn test_total_principal_equals_loan() {
        let t = terms(dec!(240000), dec!(0.06), false);
        let traj = simulate(&scenario(360), &t).unwrap();
        let principal: Money = traj.periods.iter().map(|p| p.principal).sum();
        assert_eq!(principal, dec!(240000));
    }

    #[test]
    fn test_first_period_split() {
        let t = terms(dec!(240000), dec!(0.06), false);
        let traj = simulate(&scenario(1), &t).unwrap();
        let p = &traj.periods[0];
        assert_eq!(p.interest, dec!(1200));
        assert!((p.principal - dec!(238.92)).abs() < dec!(0.01));
        assert_eq!(p.debt_service, p.interest + p.principal);
    }

    #[test]
    fn test_zero_rate_straight_line() {
        let t = terms(dec!(180000), dec!(0), false);
        let traj = simulate(&scenario(360), &t).unwrap();
        for p in &traj.periods {
            assert_eq!(p.principal, dec!(180000) / dec!(360));
            assert_eq!(p.interest, dec!(0));
        }
        assert_eq!(traj.ending_loan_balance(), dec!(0));
    }

    #[test]
    fn test_stops_at_payoff_before_holding_period() {
        let mut t = terms(dec!(240000), dec!(0.06), false);
        t.first_lien.amortization_periods = 120;
        let traj = simulate(&scenario(200), &t).unwrap();
        assert_eq!(traj.periods_simulated(), 120);
        assert_eq!(traj.requested_periods, 200);
        assert!(traj.paid_off_early);
        assert_eq!(traj.ending_loan_balance(), dec!(0));
    }

    #[test]
    fn test_negative_amortization_rejected() {
        let mut t = terms(dec!(240000), dec!(0.06), false);
        t.first_lien.scheduled_payment = Some(dec!(1000)); // interest is 1,200
        let err = simulate(&scenario(12), &t).unwrap_err();
        assert!(matches!(err, MortgageMageError::InvalidScenario { .. }));
    }

    #[test]
    fn test_interest_only_payment_allowed() {
        let mut t = terms(dec!(240000), dec!(0.06), false);
        t.first_lien.scheduled_payment = Some(dec!(1200));
        let traj = simulate(&scenario(12), &t).unwrap();
        assert_eq!(traj.ending_loan_balance(), dec!(240000));
    }

    #[test]
    fn test_pmi_burns_off_at_threshold() {
        // 95% LTV: PMI until balance / 300,000 <= 0.80
        let mut s = scenario(360);
        s.down_payment = dec!(15000);
        let t = terms(dec!(285000), dec!(0.06), true);
        let traj = simulate(&s, &t).unwrap();

        assert_eq!(traj.periods[0].pmi, dec!(95));
        let first_free = traj
            .periods
            .iter()
            .position(|p| p.pmi.is_zero())
            .unwrap();
        assert!(first_free > 0);
        // Opening balance of the first PMI-free period is at the threshold
        let opening = traj.periods[first_free - 1].ending_first_lien_balance;
        assert!(opening / dec!(300000) <= dec!(0.80));
        let prior_opening = if first_free >= 2 {
            traj.periods[first_free - 2].ending_first_lien_balance
        } else {
            dec!(285000)
        };
        assert!(prior_opening / dec!(300000) > dec!(0.80));
        // Never returns
        assert!(traj.periods[first_free..].iter().all(|p| p.pmi.is_zero()));
    }

    #[test]
    fn test_zero_rent_produces_non_positive_cash_flow() {
        let mut s = scenario(60);
        s.rental_revenue = dec!(0);
        s.operating_expenses = OperatingExpenses::Ratio { ratio: dec!(0.3) };
        let traj = simulate(&s, &terms(dec!(240000), dec!(0.06), false)).unwrap();
        assert_eq!(traj.periods_simulated(), 60);
        assert!(traj.periods.iter().all(|p| p.net_cash_flow <= dec!(0)));
    }

    #[test]
    fn test_appreciation_compounds_per_period() {
        let mut s = scenario(12);
        s.appreciation_rate = dec!(0.12);
        let traj = simulate(&s, &terms(dec!(240000), dec!(0.06), false)).unwrap();
        let mut expected = dec!(300000);
        for _ in 0..12 {
            expected *= dec!(1.01);
        }
        assert_eq!(traj.ending_property_value(), expected);
    }

    #[test]
    fn test_second_lien_amortizes_alongside_first() {
        let mut t = terms(dec!(240000), dec!(0.06), false);
        t.second_lien = Some(LoanTranche::new(
            LienPosition::Second,
            dec!(30000),
            dec!(0.09),
            120,
        ));
        let mut s = scenario(360);
        s.down_payment = dec!(30000);
        let traj = simulate(&s, &t).unwrap();

        let p120 = &traj.periods[119];
        assert_eq!(p120.ending_loan_balance, p120.ending_first_lien_balance);
        assert!(traj.periods[0].debt_service > traj.periods[120].debt_service);
        assert_eq!(traj.ending_loan_balance(), dec!(0));
    }

    #[test]
    fn test_runaway_appreciation_is_invalid_not_a_panic() {
        let mut s = scenario(360);
        s.appreciation_rate = dec!(50);
        let err = simulate(&s, &terms(dec!(240000), dec!(0.06), false)).unwrap_err();
        assert!(err.is_draw_local());

        // Within bounds per period, but doubling every year for 150 years
        // leaves Decimal's range
        let mut s = scenario(150);
        s.periods_per_year = 1;
        s.appreciation_rate = dec!(1);
        let mut t = terms(dec!(240000), dec!(0.06), false);
        t.periods_per_year = 1;
        match simulate(&s, &t) {
            Err(MortgageMageError::InvalidScenario { field, .. }) => {
                assert_eq!(field, "appreciation_rate")
            }
            other => panic!("expected InvalidScenario, got {other:?}"),
        }
    }

    #[test]
    fn test_period_mismatch_rejected() {
        let mut s = scenario(12);
        s.periods_per_year = 4;
        assert!(simulate(&s, &terms(dec!(240000), dec!(0.06), false)).is_err());
    }

    #[test]
    fn test_equity_cash_flows_include_sale() {
        let traj = simulate(&scenario(12), &terms(dec!(240000), dec!(0.06), false)).unwrap();
        let flows = traj.equity_cash_flows();
        assert_eq!(flows.len(), 13);
        assert_eq!(flows[0], dec!(-60000));
        let last = traj.periods.last().unwrap();
        assert_eq!(flows[12], last.net_cash_flow + traj.terminal_sale_proceeds());
        let expected =
            last.ending_property_value * (dec!(1) - dec!(0.06)) - last.ending_loan_balance;
        assert!((traj.terminal_sale_proceeds() - expected).abs() < dec!(0.000001));
    }
}
