use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AppreciationResample, EngineConfig};
use crate::error::MortgageMageError;
use crate::financing::FinancingTerms;
use crate::metrics::{compute_metrics, MetricsResult};
use crate::monte_carlo::sampler::Samplers;
use crate::proforma::{check_period_alignment, simulate, PropertyScenario};
use crate::types::{Money, Periods, Rate};
use crate::MortgageMageResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Deterministic starting point for every draw. Sampled inputs replace the
/// scenario's rent, tax rate and appreciation and the first-lien rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioTemplate {
    pub scenario: PropertyScenario,
    pub financing: FinancingTerms,
    /// Annual hurdle rate for acceptability
    pub hurdle_rate: Rate,
}

/// Inputs sampled for one draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawInputs {
    pub rental_revenue: Money,
    pub property_tax_rate: Rate,
    /// One annual rate, or one per year of the holding period
    pub appreciation: Vec<Rate>,
    pub interest_rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub draw: u32,
    pub inputs: DrawInputs,
    pub periods_simulated: Periods,
    pub paid_off_early: bool,
    pub metrics: MetricsResult,
}

/// A draw that was dropped because its scenario was unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedDraw {
    pub draw: u32,
    pub reason: String,
}

/// Percentile summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// A single histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

/// Descriptive statistics for one metric across completed draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Completed draws the summary covers
    pub draws: u32,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: McPercentiles,
    pub histogram: Vec<HistogramBin>,
}

/// Output of a stochastic run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticResult {
    /// Base seed the per-draw generators were derived from
    pub seed: u64,
    pub draws_requested: u32,
    pub draws_completed: u32,
    pub draws_skipped: u32,
    pub irr: MetricSummary,
    pub cash_on_cash: MetricSummary,
    pub noi: MetricSummary,
    pub equity_multiple: MetricSummary,
    pub npv_at_hurdle: MetricSummary,
    /// Share of completed draws whose IRR met the hurdle
    pub acceptance_probability: f64,
    /// Per-draw records, empty unless `keep_draws` is set
    pub draws: Vec<DrawRecord>,
    pub skipped: Vec<SkippedDraw>,
}

enum DrawOutcome {
    Completed(Box<DrawRecord>),
    Skipped(SkippedDraw),
    Failed(MortgageMageError),
    Cancelled,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `draws` independent draws of the template and summarise the metrics.
///
/// Each draw has its own generator derived from the run seed and the draw
/// index, so results do not depend on scheduling. `NoConvergence` and
/// `InvalidScenario` inside a draw skip that draw; if the skipped share
/// exceeds `max_failure_ratio`, or nothing completes, the run fails with
/// `ExcessiveFailureRate`.
pub fn run_monte_carlo(
    template: &ScenarioTemplate,
    draws: u32,
    samplers: &Samplers,
    config: &EngineConfig,
) -> MortgageMageResult<StochasticResult> {
    config.metrics.validate()?;
    config.monte_carlo.validate()?;
    if draws == 0 {
        return Err(MortgageMageError::InvalidInput {
            field: "draws".into(),
            reason: "At least one draw is required".into(),
        });
    }
    template.scenario.validate()?;
    template.financing.validate()?;
    check_period_alignment(&template.scenario, &template.financing)?;

    let seed = config.monte_carlo.seed.unwrap_or_else(rand::random);
    let start = Instant::now();
    let deadline = config
        .monte_carlo
        .timeout_ms
        .map(|ms| start + Duration::from_millis(ms));
    let cancelled = AtomicBool::new(false);

    info!(draws, seed, "starting monte carlo run");

    let run = |index: u32| -> DrawOutcome {
        if cancelled.load(Ordering::Relaxed) {
            return DrawOutcome::Cancelled;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            cancelled.store(true, Ordering::Relaxed);
            return DrawOutcome::Cancelled;
        }
        match run_draw(index, seed, template, samplers, config) {
            Ok(record) => DrawOutcome::Completed(Box::new(record)),
            Err(e) if e.is_draw_local() => {
                debug!(draw = index, error = %e, "skipping draw");
                DrawOutcome::Skipped(SkippedDraw {
                    draw: index,
                    reason: e.to_string(),
                })
            }
            Err(e) => DrawOutcome::Failed(e),
        }
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<DrawOutcome> = (0..draws).into_par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<DrawOutcome> = (0..draws).map(run).collect();

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut cancelled_draws = 0u32;
    for outcome in outcomes {
        match outcome {
            DrawOutcome::Completed(record) => records.push(*record),
            DrawOutcome::Skipped(s) => skipped.push(s),
            DrawOutcome::Failed(e) => return Err(e),
            DrawOutcome::Cancelled => cancelled_draws += 1,
        }
    }

    if cancelled_draws > 0 {
        return Err(MortgageMageError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
            completed: (records.len() + skipped.len()) as u32,
        });
    }

    let skipped_count = skipped.len() as u32;
    let threshold = config.monte_carlo.max_failure_ratio;
    if records.is_empty() || skipped_count as f64 / draws as f64 > threshold {
        return Err(MortgageMageError::ExcessiveFailureRate {
            skipped: skipped_count,
            draws,
            threshold,
        });
    }
    if skipped_count > 0 {
        warn!(skipped = skipped_count, draws, "some draws were skipped");
    }

    let accepted = records.iter().filter(|r| r.metrics.acceptable).count();
    let acceptance_probability = accepted as f64 / records.len() as f64;

    let result = StochasticResult {
        seed,
        draws_requested: draws,
        draws_completed: records.len() as u32,
        draws_skipped: skipped_count,
        irr: summarize(&records, "irr", |m| m.irr)?,
        cash_on_cash: summarize(&records, "cash_on_cash", |m| m.cash_on_cash)?,
        noi: summarize(&records, "noi", |m| m.noi)?,
        equity_multiple: summarize(&records, "equity_multiple", |m| m.equity_multiple)?,
        npv_at_hurdle: summarize(&records, "npv_at_hurdle", |m| m.npv_at_hurdle)?,
        acceptance_probability,
        draws: if config.monte_carlo.keep_draws {
            records
        } else {
            Vec::new()
        },
        skipped,
    };

    info!(
        completed = result.draws_completed,
        skipped = result.draws_skipped,
        mean_irr = result.irr.mean,
        acceptance = result.acceptance_probability,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "monte carlo run finished"
    );

    Ok(result)
}

// ---------------------------------------------------------------------------
// Draws
// ---------------------------------------------------------------------------

fn run_draw(
    index: u32,
    seed: u64,
    template: &ScenarioTemplate,
    samplers: &Samplers,
    config: &EngineConfig,
) -> MortgageMageResult<DrawRecord> {
    let mut rng = StdRng::seed_from_u64(draw_seed(seed, index));

    let rental_revenue = to_decimal(samplers.rental_revenue.sample(&mut rng), "rental_revenue", 2)?;
    let property_tax_rate = to_decimal(
        samplers.property_tax_rate.sample(&mut rng),
        "property_tax_rate",
        8,
    )?;

    let mut scenario = template.scenario.clone();
    scenario.rental_revenue = rental_revenue;
    scenario.property_tax_rate = property_tax_rate;

    let appreciation = match config.monte_carlo.appreciation_resample {
        AppreciationResample::PerDraw => {
            let rate = to_decimal(samplers.appreciation.sample(&mut rng), "appreciation_rate", 8)?;
            scenario.appreciation_rate = rate;
            scenario.appreciation_path = None;
            vec![rate]
        }
        AppreciationResample::PerYear => {
            let ppy = scenario.periods_per_year;
            let years = scenario.holding_period.div_ceil(ppy);
            let annual = (0..years)
                .map(|_| {
                    to_decimal(samplers.appreciation.sample(&mut rng), "appreciation_rate", 8)
                })
                .collect::<MortgageMageResult<Vec<Rate>>>()?;
            let path = (0..scenario.holding_period)
                .map(|period| annual[(period / ppy) as usize])
                .collect();
            scenario.appreciation_rate = annual[0];
            scenario.appreciation_path = Some(path);
            annual
        }
    };

    let interest_rate = to_decimal(samplers.interest_rate.sample(&mut rng), "interest_rate", 8)?;
    let terms = template.financing.with_first_lien_rate(interest_rate);

    let trajectory = simulate(&scenario, &terms)?;
    let metrics = compute_metrics(&trajectory, template.hurdle_rate, &config.metrics)?;

    Ok(DrawRecord {
        draw: index,
        inputs: DrawInputs {
            rental_revenue,
            property_tax_rate,
            appreciation,
            interest_rate,
        },
        periods_simulated: trajectory.periods_simulated(),
        paid_off_early: trajectory.paid_off_early,
        metrics,
    })
}

/// SplitMix64 over (seed, index): well-spread, independent per-draw seeds.
fn draw_seed(seed: u64, index: u32) -> u64 {
    let mut z = seed.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn to_decimal(value: f64, field: &str, dp: u32) -> MortgageMageResult<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(dp))
        .ok_or_else(|| {
            MortgageMageError::invalid_scenario(
                field,
                format!("sampled value {value} is not finite"),
            )
        })
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Number of equal-width bins in each metric histogram.
const HISTOGRAM_BINS: usize = 20;

fn summarize(
    records: &[DrawRecord],
    name: &str,
    metric: impl Fn(&MetricsResult) -> Decimal,
) -> MortgageMageResult<MetricSummary> {
    let values = records
        .iter()
        .map(|r| {
            let value = metric(&r.metrics);
            value.to_f64().ok_or_else(|| MortgageMageError::InvalidInput {
                field: name.into(),
                reason: format!("draw {} value {value} has no f64 form", r.draw),
            })
        })
        .collect::<MortgageMageResult<Vec<f64>>>()?;
    let sample = SortedSample::new(values).ok_or_else(|| MortgageMageError::InvalidInput {
        field: name.into(),
        reason: "no completed draws to summarise".into(),
    })?;

    Ok(MetricSummary {
        draws: sample.len() as u32,
        mean: sample.mean(),
        median: sample.quantile(0.50),
        std_dev: sample.std_dev(),
        min: sample.min(),
        max: sample.max(),
        percentiles: McPercentiles {
            p5: sample.quantile(0.05),
            p10: sample.quantile(0.10),
            p25: sample.quantile(0.25),
            p50: sample.quantile(0.50),
            p75: sample.quantile(0.75),
            p90: sample.quantile(0.90),
            p95: sample.quantile(0.95),
        },
        histogram: sample.histogram(HISTOGRAM_BINS),
    })
}

/// One metric across the completed draws, sorted ascending. Never empty.
struct SortedSample(Vec<f64>);

impl SortedSample {
    fn new(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        Some(Self(values))
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn min(&self) -> f64 {
        self.0[0]
    }

    fn max(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    fn mean(&self) -> f64 {
        self.0.iter().sum::<f64>() / self.len() as f64
    }

    /// Population standard deviation.
    fn std_dev(&self) -> f64 {
        let mean = self.mean();
        let sum_sq: f64 = self.0.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / self.len() as f64).sqrt()
    }

    /// Quantile `q` in [0, 1], interpolating linearly between ranks.
    fn quantile(&self, q: f64) -> f64 {
        let last = self.len() - 1;
        let position = q.clamp(0.0, 1.0) * last as f64;
        let below = position.floor() as usize;
        let above = (below + 1).min(last);
        let weight = position - below as f64;
        self.0[below] + (self.0[above] - self.0[below]) * weight
    }

    /// Equal-width bins from min to max; a degenerate sample is one bin.
    fn histogram(&self, bins: usize) -> Vec<HistogramBin> {
        let (lo, hi) = (self.min(), self.max());
        let total = self.len() as f64;
        if bins == 0 || hi - lo < f64::EPSILON {
            return vec![HistogramBin {
                lower: lo,
                upper: hi,
                count: self.len() as u32,
                frequency: 1.0,
            }];
        }

        let width = (hi - lo) / bins as f64;
        let mut counts = vec![0u32; bins];
        for value in &self.0 {
            let slot = ((value - lo) / width) as usize;
            counts[slot.min(bins - 1)] += 1;
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: lo + width * i as f64,
                upper: if i + 1 == bins {
                    hi
                } else {
                    lo + width * (i + 1) as f64
                },
                count,
                frequency: f64::from(count) / total,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonteCarloConfig;
    use crate::financing::LoanTranche;
    use crate::monte_carlo::sampler::{McDistribution, StochasticInputs};
    use crate::proforma::OperatingExpenses;
    use crate::types::LienPosition;
    use rust_decimal_macros::dec;

    fn template() -> ScenarioTemplate {
        ScenarioTemplate {
            scenario: PropertyScenario {
                purchase_price: dec!(300000),
                down_payment: dec!(60000),
                closing_costs: dec!(0),
                holding_period: 60,
                periods_per_year: 12,
                rental_revenue: dec!(2200),
                property_tax_rate: dec!(0.015),
                tax_exemption: dec!(0),
                annual_insurance: dec!(1200),
                appreciation_rate: dec!(0.03),
                appreciation_path: None,
                operating_expenses: OperatingExpenses::Fixed { amount: dec!(500) },
                disposition_cost_rate: dec!(0.06),
            },
            financing: FinancingTerms {
                first_lien: LoanTranche::new(LienPosition::First, dec!(240000), dec!(0.06), 360),
                second_lien: None,
                periods_per_year: 12,
                requires_pmi: false,
                pmi_rate: dec!(0.004),
                pmi_ltv_threshold: dec!(0.80),
            },
            hurdle_rate: dec!(0.08),
        }
    }

    fn inputs(interest: McDistribution) -> StochasticInputs {
        StochasticInputs {
            rental_revenue: McDistribution::TruncatedNormal {
                mean: 2200.0,
                std_dev: 150.0,
                lower: Some(0.0),
                upper: None,
            },
            property_tax_rate: McDistribution::Uniform {
                min: 0.012,
                max: 0.02,
            },
            appreciation: McDistribution::Normal {
                mean: 0.03,
                std_dev: 0.02,
            },
            interest_rate: Some(interest),
        }
    }

    fn config(seed: u64) -> EngineConfig {
        EngineConfig {
            monte_carlo: MonteCarloConfig {
                seed: Some(seed),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn stable_rates() -> McDistribution {
        McDistribution::Uniform {
            min: 0.055,
            max: 0.07,
        }
    }

    #[test]
    fn test_same_seed_reproduces_run() {
        let samplers = inputs(stable_rates()).samplers(None).unwrap();
        let a = run_monte_carlo(&template(), 200, &samplers, &config(42)).unwrap();
        let b = run_monte_carlo(&template(), 200, &samplers, &config(42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.draws_completed, 200);
        assert_eq!(a.draws.len(), 200);
    }

    #[test]
    fn test_different_seeds_differ() {
        let samplers = inputs(stable_rates()).samplers(None).unwrap();
        let a = run_monte_carlo(&template(), 100, &samplers, &config(1)).unwrap();
        let b = run_monte_carlo(&template(), 100, &samplers, &config(2)).unwrap();
        assert_ne!(a.irr.mean, b.irr.mean);
    }

    #[test]
    fn test_summary_ordering() {
        let samplers = inputs(stable_rates()).samplers(None).unwrap();
        let r = run_monte_carlo(&template(), 300, &samplers, &config(9)).unwrap();
        let p = &r.irr.percentiles;
        assert!(r.irr.min <= p.p5 && p.p5 <= p.p50 && p.p50 <= p.p95 && p.p95 <= r.irr.max);
        assert!((0.0..=1.0).contains(&r.acceptance_probability));
        let binned: u32 = r.irr.histogram.iter().map(|b| b.count).sum();
        assert_eq!(binned, r.draws_completed);
    }

    #[test]
    fn test_invalid_draws_are_skipped() {
        // Roughly a third of sampled rates are negative
        let samplers = inputs(McDistribution::Uniform {
            min: -0.03,
            max: 0.06,
        })
        .samplers(None)
        .unwrap();
        let mut cfg = config(5);
        cfg.monte_carlo.max_failure_ratio = 0.6;
        let r = run_monte_carlo(&template(), 200, &samplers, &cfg).unwrap();
        assert!(r.draws_skipped > 0);
        assert_eq!(r.draws_completed + r.draws_skipped, 200);
        assert_eq!(r.skipped.len() as u32, r.draws_skipped);
        assert!(r
            .draws
            .iter()
            .all(|d| d.inputs.interest_rate >= Decimal::ZERO));
    }

    #[test]
    fn test_excessive_skips_fail_the_run() {
        let samplers = inputs(McDistribution::Uniform {
            min: -0.03,
            max: 0.06,
        })
        .samplers(None)
        .unwrap();
        let err = run_monte_carlo(&template(), 200, &samplers, &config(5)).unwrap_err();
        assert!(matches!(err, MortgageMageError::ExcessiveFailureRate { draws: 200, .. }));
    }

    #[test]
    fn test_no_successful_draws_fails_even_with_lenient_threshold() {
        let samplers = inputs(McDistribution::Fixed { value: -0.01 })
            .samplers(None)
            .unwrap();
        let mut cfg = config(5);
        cfg.monte_carlo.max_failure_ratio = 1.0;
        let err = run_monte_carlo(&template(), 20, &samplers, &cfg).unwrap_err();
        assert!(matches!(
            err,
            MortgageMageError::ExcessiveFailureRate {
                skipped: 20,
                draws: 20,
                ..
            }
        ));
    }

    #[test]
    fn test_per_year_appreciation() {
        let samplers = inputs(stable_rates()).samplers(None).unwrap();
        let mut cfg = config(11);
        cfg.monte_carlo.appreciation_resample = AppreciationResample::PerYear;
        let r = run_monte_carlo(&template(), 20, &samplers, &cfg).unwrap();
        // 60 monthly periods: five annual draws
        assert!(r.draws.iter().all(|d| d.inputs.appreciation.len() == 5));
        let first = &r.draws[0].inputs.appreciation;
        assert!(first.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_zero_timeout_cancels_run() {
        let samplers = inputs(stable_rates()).samplers(None).unwrap();
        let mut cfg = config(3);
        cfg.monte_carlo.timeout_ms = Some(0);
        let err = run_monte_carlo(&template(), 50, &samplers, &cfg).unwrap_err();
        assert!(matches!(err, MortgageMageError::Timeout { .. }));
    }

    #[test]
    fn test_draw_records_can_be_dropped() {
        let samplers = inputs(stable_rates()).samplers(None).unwrap();
        let mut cfg = config(4);
        cfg.monte_carlo.keep_draws = false;
        let r = run_monte_carlo(&template(), 30, &samplers, &cfg).unwrap();
        assert!(r.draws.is_empty());
        assert_eq!(r.draws_completed, 30);
    }

    #[test]
    fn test_misaligned_periods_fail_before_sampling() {
        let samplers = inputs(stable_rates()).samplers(None).unwrap();
        let mut t = template();
        t.scenario.periods_per_year = 4;
        t.scenario.holding_period = 20;
        let err = run_monte_carlo(&t, 50, &samplers, &config(1)).unwrap_err();
        match err {
            MortgageMageError::InvalidScenario { field, .. } => {
                assert_eq!(field, "periods_per_year")
            }
            other => panic!("expected InvalidScenario, got {other:?}"),
        }
    }

    #[test]
    fn test_runaway_appreciation_draws_are_skipped() {
        let mut stochastic = inputs(stable_rates());
        // Half of all draws exceed 100% a year, some by many orders of magnitude
        stochastic.appreciation = McDistribution::LogNormal {
            mu: 0.0,
            sigma: 3.0,
        };
        let samplers = stochastic.samplers(None).unwrap();
        let mut cfg = config(8);
        cfg.monte_carlo.max_failure_ratio = 1.0;
        let mut t = template();
        t.scenario.holding_period = 360;

        let r = run_monte_carlo(&t, 200, &samplers, &cfg).unwrap();
        assert!(r.draws_skipped > 0);
        assert!(r.draws_completed > 0);
        assert_eq!(r.draws_completed + r.draws_skipped, 200);
        assert!(r.skipped.iter().all(|s| s.reason.contains("ppreciation")));
    }

    #[test]
    fn test_zero_draws_rejected() {
        let samplers = inputs(stable_rates()).samplers(None).unwrap();
        assert!(run_monte_carlo(&template(), 0, &samplers, &config(1)).is_err());
    }

    #[test]
    fn test_draw_seeds_are_distinct() {
        let seeds: std::collections::HashSet<u64> = (0..1_000).map(|i| draw_seed(42, i)).collect();
        assert_eq!(seeds.len(), 1_000);
    }

    #[test]
    fn test_quantile_interpolation() {
        let sample = SortedSample::new(vec![5.0, 1.0, 4.0, 2.0, 3.0]).unwrap();
        assert_eq!(sample.quantile(0.5), 3.0);
        assert_eq!(sample.quantile(0.25), 2.0);
        assert!((sample.quantile(0.10) - 1.4).abs() < 1e-12);
        assert_eq!(sample.quantile(1.0), 5.0);
        assert!(SortedSample::new(Vec::new()).is_none());
    }

    #[test]
    fn test_histogram_bins_cover_sample() {
        let sample = SortedSample::new((0..100).map(f64::from).collect()).unwrap();
        let bins = sample.histogram(20);
        assert_eq!(bins.len(), 20);
        assert!(bins.iter().all(|b| b.count == 5));
        assert_eq!(bins[19].upper, 99.0);

        let flat = SortedSample::new(vec![0.07; 3]).unwrap().histogram(20);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].count, 3);
    }
}
