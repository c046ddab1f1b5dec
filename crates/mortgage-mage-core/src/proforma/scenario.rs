use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MortgageMageError;
use crate::financing::FinancingRequest;
use crate::types::{Money, Periods, Rate};
use crate::MortgageMageResult;

/// Operating expenses, either a share of rent or a fixed amount per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatingExpenses {
    Fixed { amount: Money },
    Ratio { ratio: Rate },
}

impl OperatingExpenses {
    pub fn for_rent(&self, rent: Money) -> Money {
        match self {
            OperatingExpenses::Fixed { amount } => *amount,
            OperatingExpenses::Ratio { ratio } => rent * *ratio,
        }
    }
}

fn default_periods_per_year() -> u32 {
    12
}

fn default_disposition_cost_rate() -> Rate {
    dec!(0.06)
}

/// Property and ownership assumptions for one investment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyScenario {
    pub purchase_price: Money,
    pub down_payment: Money,
    /// Buyer-paid closing costs, funded from equity at purchase
    #[serde(default)]
    pub closing_costs: Money,
    /// Requested holding period in periods
    pub holding_period: Periods,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
    /// Gross rent collected each period
    pub rental_revenue: Money,
    /// Annual property tax rate on assessed value
    pub property_tax_rate: Rate,
    /// Flat exemption subtracted from the purchase price to get assessed value
    #[serde(default)]
    pub tax_exemption: Money,
    #[serde(default)]
    pub annual_insurance: Money,
    /// Annual appreciation (negative for depreciation)
    pub appreciation_rate: Rate,
    /// Annual appreciation rate applying in each period; overrides
    /// `appreciation_rate` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appreciation_path: Option<Vec<Rate>>,
    pub operating_expenses: OperatingExpenses,
    /// Selling costs as a fraction of sale price
    #[serde(default = "default_disposition_cost_rate")]
    pub disposition_cost_rate: Rate,
}

impl PropertyScenario {
    /// Cash the investor puts in at purchase.
    pub fn initial_equity(&self) -> Money {
        self.down_payment + self.closing_costs
    }

    pub fn loan_amount(&self) -> Money {
        self.purchase_price - self.down_payment
    }

    /// First-lien-only financing request covering the price less the down
    /// payment.
    pub fn financing_request(&self) -> FinancingRequest {
        FinancingRequest {
            loan_amount: self.loan_amount(),
            property_value: self.purchase_price,
            second_lien: None,
            amortization_periods: None,
        }
    }

    pub fn assessed_value(&self) -> Money {
        (self.purchase_price - self.tax_exemption).max(Decimal::ZERO)
    }

    pub fn property_tax_per_period(&self) -> Money {
        self.assessed_value() * self.property_tax_rate / Decimal::from(self.periods_per_year)
    }

    pub fn insurance_per_period(&self) -> Money {
        self.annual_insurance / Decimal::from(self.periods_per_year)
    }

    /// Annual appreciation rate in force during the zero-based period `index`.
    pub fn appreciation_for(&self, index: usize) -> Rate {
        self.appreciation_path
            .as_ref()
            .and_then(|path| path.get(index).copied())
            .unwrap_or(self.appreciation_rate)
    }

    pub fn validate(&self) -> MortgageMageResult<()> {
        if self.purchase_price <= Decimal::ZERO {
            return Err(MortgageMageError::invalid_scenario(
                "purchase_price",
                "Purchase price must be positive",
            ));
        }
        if self.down_payment < Decimal::ZERO || self.down_payment > self.purchase_price {
            return Err(MortgageMageError::invalid_scenario(
                "down_payment",
                "Down payment must be between zero and the purchase price",
            ));
        }
        if self.closing_costs < Decimal::ZERO {
            return Err(MortgageMageError::invalid_scenario(
                "closing_costs",
                "Closing costs cannot be negative",
            ));
        }
        if self.initial_equity() <= Decimal::ZERO {
            return Err(MortgageMageError::invalid_scenario(
                "down_payment",
                "Initial equity (down payment + closing costs) must be positive",
            ));
        }
        if self.holding_period == 0 {
            return Err(MortgageMageError::invalid_scenario(
                "holding_period",
                "Holding period must be at least one period",
            ));
        }
        if self.periods_per_year == 0 {
            return Err(MortgageMageError::invalid_scenario(
                "periods_per_year",
                "Periods per year must be positive",
            ));
        }
        if self.rental_revenue < Decimal::ZERO {
            return Err(MortgageMageError::invalid_scenario(
                "rental_revenue",
                "Rental revenue cannot be negative",
            ));
        }
        if self.property_tax_rate < Decimal::ZERO || self.property_tax_rate >= Decimal::ONE {
            return Err(MortgageMageError::invalid_scenario(
                "property_tax_rate",
                "Property tax rate must be in [0, 1)",
            ));
        }
        if self.tax_exemption < Decimal::ZERO {
            return Err(MortgageMageError::invalid_scenario(
                "tax_exemption",
                "Tax exemption cannot be negative",
            ));
        }
        if self.annual_insurance < Decimal::ZERO {
            return Err(MortgageMageError::invalid_scenario(
                "annual_insurance",
                "Insurance cost cannot be negative",
            ));
        }
        if !appreciation_in_range(self.appreciation_rate) {
            return Err(MortgageMageError::invalid_scenario(
                "appreciation_rate",
                format!("Appreciation must be in (-100%, {MAX_APPRECIATION}]"),
            ));
        }
        if let Some(path) = &self.appreciation_path {
            if path.len() < self.holding_period as usize {
                return Err(MortgageMageError::invalid_scenario(
                    "appreciation_path",
                    format!(
                        "Path covers {} periods but the holding period is {}",
                        path.len(),
                        self.holding_period
                    ),
                ));
            }
            if let Some(bad) = path.iter().find(|r| !appreciation_in_range(**r)) {
                return Err(MortgageMageError::invalid_scenario(
                    "appreciation_path",
                    format!("Appreciation {bad} is outside (-100%, {MAX_APPRECIATION}]"),
                ));
            }
        }
        match &self.operating_expenses {
            OperatingExpenses::Fixed { amount } if *amount < Decimal::ZERO => {
                return Err(MortgageMageError::invalid_scenario(
                    "operating_expenses",
                    "Fixed expenses cannot be negative",
                ));
            }
            OperatingExpenses::Ratio { ratio }
                if !(Decimal::ZERO..=Decimal::ONE).contains(ratio) =>
            {
                return Err(MortgageMageError::invalid_scenario(
                    "operating_expenses",
                    "Expense ratio must be in [0, 1]",
                ));
            }
            _ => {}
        }
        if !(Decimal::ZERO..Decimal::ONE).contains(&self.disposition_cost_rate) {
            return Err(MortgageMageError::invalid_scenario(
                "disposition_cost_rate",
                "Disposition cost rate must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Largest annual appreciation a scenario may carry (100% a year).
pub const MAX_APPRECIATION: Rate = dec!(1);

fn appreciation_in_range(rate: Rate) -> bool {
    rate > dec!(-1) && rate <= MAX_APPRECIATION
}
