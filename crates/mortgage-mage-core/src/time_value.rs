use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::config::MetricsConfig;
use crate::error::MortgageMageError;
use crate::types::{Money, Periods, Rate};
use crate::MortgageMageResult;

/// Net Present Value of a series of per-period cash flows, first flow at t=0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> MortgageMageResult<Money> {
    if rate <= dec!(-1) {
        return Err(MortgageMageError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(MortgageMageError::InvalidInput {
                field: "rate".into(),
                reason: format!("NPV discount factor vanished at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// Level payment that fully amortizes `principal` over `periods` at
/// `periodic_rate`: P * r(1+r)^n / ((1+r)^n - 1).
pub fn level_payment(
    principal: Money,
    periodic_rate: Rate,
    periods: Periods,
) -> MortgageMageResult<Money> {
    if periods == 0 {
        return Err(MortgageMageError::InvalidInput {
            field: "periods".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if periodic_rate.is_zero() {
        // Interest-free: straight-line amortisation
        return Ok(principal / Decimal::from(periods));
    }

    let compound = (Decimal::ONE + periodic_rate)
        .checked_powi(i64::from(periods))
        .ok_or_else(|| MortgageMageError::InvalidInput {
            field: "periods".into(),
            reason: format!("(1 + {periodic_rate})^{periods} overflows the annuity factor"),
        })?;

    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(MortgageMageError::InvalidInput {
            field: "periodic_rate".into(),
            reason: "Payment annuity factor is zero".into(),
        });
    }

    Ok(principal * periodic_rate * compound / denominator)
}

/// Internal rate of return per period, found by bisection over the bracket
/// configured in `MetricsConfig`.
///
/// Root-finding runs in f64: discount factors over long holding periods leave
/// Decimal's range well before they leave f64's. Fails with `NoConvergence`
/// when NPV does not change sign across the bracket.
pub fn irr(cash_flows: &[Money], config: &MetricsConfig) -> MortgageMageResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(MortgageMageError::InvalidInput {
            field: "cash_flows".into(),
            reason: "IRR requires at least 2 cash flows".into(),
        });
    }

    let flows = cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| {
            cf.to_f64().ok_or_else(|| MortgageMageError::InvalidInput {
                field: "cash_flows".into(),
                reason: format!("cash flow {cf} at period {t} has no f64 form"),
            })
        })
        .collect::<MortgageMageResult<Vec<f64>>>()?;

    let mut lo = config.irr_lower_bound;
    let mut hi = config.irr_upper_bound;
    let mut f_lo = npv_f64(lo, &flows);
    let f_hi = npv_f64(hi, &flows);

    if !f_lo.is_finite() || !f_hi.is_finite() {
        return Err(MortgageMageError::NoConvergence {
            function: "IRR".into(),
            iterations: 0,
            last_delta: f_lo,
        });
    }
    if f_lo == 0.0 {
        return to_rate(lo);
    }
    if f_hi == 0.0 {
        return to_rate(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return Err(MortgageMageError::NoConvergence {
            function: "IRR".into(),
            iterations: 0,
            last_delta: f_lo.abs().min(f_hi.abs()),
        });
    }

    for _ in 0..config.irr_max_iterations {
        let mid = 0.5 * (lo + hi);
        let f_mid = npv_f64(mid, &flows);
        if f_mid == 0.0 || 0.5 * (hi - lo) < config.irr_tolerance {
            return to_rate(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(MortgageMageError::NoConvergence {
        function: "IRR".into(),
        iterations: config.irr_max_iterations,
        last_delta: f_lo,
    })
}

/// Compound a per-period rate to an annual rate: (1 + r)^n - 1.
pub fn annualize(periodic_rate: Rate, periods_per_year: u32) -> MortgageMageResult<Rate> {
    (Decimal::ONE + periodic_rate)
        .checked_powi(periods_per_year as i64)
        .map(|growth| growth - Decimal::ONE)
        .ok_or_else(|| {
            MortgageMageError::invalid_scenario(
                "periodic_rate",
                format!("annualising {periodic_rate} over {periods_per_year} periods overflows"),
            )
        })
}

/// Per-period rate equivalent to an annual compound rate: (1 + r)^(1/n) - 1.
pub fn deannualize(annual_rate: Rate, periods_per_year: u32) -> MortgageMageResult<Rate> {
    if annual_rate <= dec!(-1) {
        return Err(MortgageMageError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Rate must be greater than -100%".into(),
        });
    }
    if periods_per_year == 1 {
        return Ok(annual_rate);
    }
    let exponent = Decimal::ONE / Decimal::from(periods_per_year);
    Ok((Decimal::ONE + annual_rate).powd(exponent) - Decimal::ONE)
}

fn npv_f64(rate: f64, flows: &[f64]) -> f64 {
    let step = 1.0 / (1.0 + rate);
    let mut discount = 1.0;
    let mut total = 0.0;
    for cf in flows {
        total += cf * discount;
        discount *= step;
    }
    total
}

fn to_rate(value: f64) -> MortgageMageResult<Rate> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(12))
        .ok_or_else(|| MortgageMageError::NoConvergence {
            function: "IRR".into(),
            iterations: 0,
            last_delta: value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_irr_single_period_round_trip() {
        let cfg = MetricsConfig::default();
        for r in [dec!(0.10), dec!(0.035), dec!(-0.2), dec!(0.75)] {
            let x = dec!(250000);
            let cfs = vec![-x, x * (Decimal::ONE + r)];
            let result = irr(&cfs, &cfg).unwrap();
            assert!(
                (result - r).abs() < dec!(0.00000001),
                "expected {r}, got {result}"
            );
        }
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, &MetricsConfig::default()).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_no_sign_change() {
        let cfs = vec![dec!(100), dec!(50), dec!(50)];
        let err = irr(&cfs, &MetricsConfig::default()).unwrap_err();
        assert!(matches!(err, MortgageMageError::NoConvergence { .. }));
    }

    #[test]
    fn test_irr_requires_two_flows() {
        assert!(irr(&[dec!(-1)], &MetricsConfig::default()).is_err());
    }

    #[test]
    fn test_level_payment_sanity() {
        // $240,000 at 6%/12 over 360 months ≈ $1,438.92
        let pmt = level_payment(dec!(240000), dec!(0.005), 360).unwrap();
        assert!((pmt - dec!(1438.92)).abs() < dec!(0.01), "pmt={pmt}");
    }

    #[test]
    fn test_level_payment_overflow_is_an_error() {
        // 8.33% a period for 2,000 periods leaves Decimal's range
        let err = level_payment(dec!(240000), dec!(0.0833), 2_000).unwrap_err();
        assert!(matches!(
            err,
            MortgageMageError::InvalidInput { ref field, .. } if field == "periods"
        ));
        assert!(level_payment(dec!(240000), dec!(0.0833), 360).is_ok());
    }

    #[test]
    fn test_level_payment_zero_rate() {
        assert_eq!(level_payment(dec!(36000), dec!(0), 360).unwrap(), dec!(100));
    }

    #[test]
    fn test_annualize_round_trip() {
        let periodic = deannualize(dec!(0.12), 12).unwrap();
        let annual = annualize(periodic, 12).unwrap();
        assert!((annual - dec!(0.12)).abs() < dec!(0.0000001));
    }
}
