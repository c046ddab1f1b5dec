use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::MortgageMageError;
use crate::time_value::level_payment;
use crate::types::{LienPosition, Money, Periods, Rate};
use crate::MortgageMageResult;

/// One fixed-rate, fully amortizing loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTranche {
    pub lien: LienPosition,
    pub amount: Money,
    /// Annual nominal rate
    pub annual_rate: Rate,
    pub amortization_periods: Periods,
    /// Payment agreed with the lender. When absent the level payment that
    /// retires the loan over `amortization_periods` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_payment: Option<Money>,
}

impl LoanTranche {
    pub fn new(lien: LienPosition, amount: Money, annual_rate: Rate, periods: Periods) -> Self {
        Self {
            lien,
            amount,
            annual_rate,
            amortization_periods: periods,
            scheduled_payment: None,
        }
    }

    /// Annual rate divided evenly over the year's periods.
    pub fn periodic_rate(&self, periods_per_year: u32) -> Rate {
        self.annual_rate / Decimal::from(periods_per_year)
    }

    pub fn payment(&self, periods_per_year: u32) -> MortgageMageResult<Money> {
        match self.scheduled_payment {
            Some(p) => Ok(p),
            None => level_payment(
                self.amount,
                self.periodic_rate(periods_per_year),
                self.amortization_periods,
            ),
        }
    }

    fn validate(&self, field: &str) -> MortgageMageResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(MortgageMageError::invalid_scenario(
                field,
                format!("{} lien amount must be positive", self.lien),
            ));
        }
        if self.annual_rate < Decimal::ZERO || self.annual_rate >= Decimal::ONE {
            return Err(MortgageMageError::invalid_scenario(
                field,
                format!("{} lien rate {} must be in [0, 1)", self.lien, self.annual_rate),
            ));
        }
        if self.amortization_periods == 0 {
            return Err(MortgageMageError::invalid_scenario(
                field,
                "Amortization term must be at least one period",
            ));
        }
        if let Some(p) = self.scheduled_payment {
            if p <= Decimal::ZERO {
                return Err(MortgageMageError::invalid_scenario(
                    field,
                    "Scheduled payment must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// Financing for one scenario: a first lien, an optional second lien and the
/// PMI policy that applies to the first lien.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingTerms {
    pub first_lien: LoanTranche,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_lien: Option<LoanTranche>,
    pub periods_per_year: u32,
    pub requires_pmi: bool,
    /// Annual PMI premium as a fraction of the original first-lien amount
    pub pmi_rate: Rate,
    /// PMI stops once first-lien balance / original value is at or below this
    pub pmi_ltv_threshold: Rate,
}

impl FinancingTerms {
    pub fn total_loan_amount(&self) -> Money {
        self.first_lien.amount
            + self
                .second_lien
                .as_ref()
                .map(|t| t.amount)
                .unwrap_or(Decimal::ZERO)
    }

    /// Periodic PMI payment while PMI is in force.
    pub fn pmi_payment(&self) -> Money {
        if !self.requires_pmi {
            return Decimal::ZERO;
        }
        self.pmi_rate * self.first_lien.amount / Decimal::from(self.periods_per_year)
    }

    /// Same structure with a different first-lien rate.
    pub fn with_first_lien_rate(&self, annual_rate: Rate) -> Self {
        let mut terms = self.clone();
        terms.first_lien.annual_rate = annual_rate;
        terms
    }

    pub fn validate(&self) -> MortgageMageResult<()> {
        if self.periods_per_year == 0 {
            return Err(MortgageMageError::invalid_scenario(
                "periods_per_year",
                "Periods per year must be positive",
            ));
        }
        self.first_lien.validate("first_lien")?;
        if self.first_lien.lien != LienPosition::First {
            return Err(MortgageMageError::invalid_scenario(
                "first_lien",
                "First tranche must hold the first lien",
            ));
        }
        if let Some(second) = &self.second_lien {
            second.validate("second_lien")?;
            if second.lien != LienPosition::Second {
                return Err(MortgageMageError::invalid_scenario(
                    "second_lien",
                    "Second tranche must hold the second lien",
                ));
            }
        }
        if self.pmi_rate < Decimal::ZERO || self.pmi_rate >= Decimal::ONE {
            return Err(MortgageMageError::invalid_scenario(
                "pmi_rate",
                "PMI rate must be in [0, 1)",
            ));
        }
        if self.pmi_ltv_threshold <= Decimal::ZERO || self.pmi_ltv_threshold > Decimal::ONE {
            return Err(MortgageMageError::invalid_scenario(
                "pmi_ltv_threshold",
                "PMI threshold must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn terms() -> FinancingTerms {
        FinancingTerms {
            first_lien: LoanTranche::new(LienPosition::First, dec!(285000), dec!(0.065), 360),
            second_lien: None,
            periods_per_year: 12,
            requires_pmi: true,
            pmi_rate: dec!(0.004),
            pmi_ltv_threshold: dec!(0.80),
        }
    }

    #[test]
    fn test_pmi_payment_on_original_amount() {
        // 0.4% of 285,000 per year over 12 months = 95
        assert_eq!(terms().pmi_payment(), dec!(95));
    }

    #[test]
    fn test_no_pmi_payment_when_not_required() {
        let mut t = terms();
        t.requires_pmi = false;
        assert_eq!(t.pmi_payment(), Decimal::ZERO);
    }

    #[test]
    fn test_scheduled_payment_override() {
        let mut tranche = LoanTranche::new(LienPosition::First, dec!(100000), dec!(0.06), 360);
        tranche.scheduled_payment = Some(dec!(700));
        assert_eq!(tranche.payment(12).unwrap(), dec!(700));
    }

    #[test]
    fn test_with_first_lien_rate_keeps_structure() {
        let t = terms().with_first_lien_rate(dec!(0.07));
        assert_eq!(t.first_lien.annual_rate, dec!(0.07));
        assert_eq!(t.first_lien.amount, dec!(285000));
        assert!(t.requires_pmi);
    }

    #[test]
    fn test_rate_out_of_range_rejected() {
        let t = terms().with_first_lien_rate(dec!(1.5));
        assert!(matches!(
            t.validate(),
            Err(MortgageMageError::InvalidScenario { .. })
        ));
    }

    #[test]
    fn test_total_loan_amount_includes_second_lien() {
        let mut t = terms();
        t.second_lien = Some(LoanTranche::new(
            LienPosition::Second,
            dec!(30000),
            dec!(0.085),
            240,
        ));
        assert_eq!(t.total_loan_amount(), dec!(315000));
    }
}
