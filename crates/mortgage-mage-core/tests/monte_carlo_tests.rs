#![cfg(feature = "monte_carlo")]

use chrono::Utc;
use mortgage_mage_core::analysis::analyze_monte_carlo;
use mortgage_mage_core::config::{AggregatorConfig, EngineConfig, MonteCarloConfig, RateModelConfig};
use mortgage_mage_core::financing::MortgageRateModel;
use mortgage_mage_core::monte_carlo::{
    run_monte_carlo, McDistribution, ScenarioTemplate, StochasticInputs,
};
use mortgage_mage_core::proforma::{OperatingExpenses, PropertyScenario};
use mortgage_mage_core::rates::{RateAggregator, RateQuote, StaticRateSource};
use mortgage_mage_core::LienPosition;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn aggregator() -> RateAggregator {
    let now = Utc::now();
    let quotes = [dec!(0.055), dec!(0.0575), dec!(0.06), dec!(0.0625), dec!(0.065)]
        .into_iter()
        .map(|rate| RateQuote {
            source_id: "lender".into(),
            ltv: dec!(0.80),
            lien: LienPosition::First,
            rate,
            observed_at: now,
        })
        .collect();
    RateAggregator::new(AggregatorConfig::default(), now)
        .unwrap()
        .with_source(StaticRateSource::new("lender", quotes))
}

fn scenario() -> PropertyScenario {
    PropertyScenario {
        purchase_price: dec!(394900),
        down_payment: dec!(78980),
        closing_costs: dec!(8000),
        holding_period: 120,
        periods_per_year: 12,
        rental_revenue: dec!(3600),
        property_tax_rate: dec!(0.019),
        tax_exemption: dec!(10000),
        annual_insurance: dec!(3000),
        appreciation_rate: dec!(0.03),
        appreciation_path: None,
        operating_expenses: OperatingExpenses::Ratio { ratio: dec!(0.10) },
        disposition_cost_rate: dec!(0.06),
    }
}

fn inputs() -> StochasticInputs {
    serde_json::from_str(
        r#"{
            "rental_revenue": {"type": "TruncatedNormal", "mean": 3600, "std_dev": 200, "lower": 0},
            "property_tax_rate": {
                "type": "TruncatedNormal", "mean": 0.019, "std_dev": 0.002, "lower": 0
            },
            "appreciation": {"type": "Normal", "mean": 0.03, "std_dev": 0.03}
        }"#,
    )
    .unwrap()
}

fn engine_config(seed: u64) -> EngineConfig {
    EngineConfig {
        monte_carlo: MonteCarloConfig {
            seed: Some(seed),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_empirical_rates_drive_reproducible_runs() {
    let aggregator = aggregator();
    let model = MortgageRateModel::new(&aggregator, RateModelConfig::default()).unwrap();
    let quote = model.quote(&scenario().financing_request()).unwrap();

    let template = ScenarioTemplate {
        scenario: scenario(),
        financing: quote.terms.clone(),
        hurdle_rate: dec!(0.08),
    };
    let samplers = inputs().samplers(Some(&quote.first_lien_rates)).unwrap();

    let first = run_monte_carlo(&template, 250, &samplers, &engine_config(42)).unwrap();
    let second = run_monte_carlo(&template, 250, &samplers, &engine_config(42)).unwrap();
    assert_eq!(first, second);

    assert_eq!(first.draws_completed + first.draws_skipped, 250);
    let quoted = quote.first_lien_rates.rates();
    assert!(first
        .draws
        .iter()
        .all(|d| quoted.contains(&d.inputs.interest_rate)));
}

#[test]
fn test_analysis_envelope_for_monte_carlo() {
    let aggregator = aggregator();
    let model = MortgageRateModel::new(&aggregator, RateModelConfig::default()).unwrap();
    let terms = model.financing_terms(&scenario().financing_request()).unwrap();

    let template = ScenarioTemplate {
        scenario: scenario(),
        financing: terms,
        hurdle_rate: dec!(0.08),
    };
    let mut stochastic = inputs();
    stochastic.interest_rate = Some(McDistribution::Fixed { value: 0.06 });
    let samplers = stochastic.samplers(None).unwrap();

    let out = analyze_monte_carlo(&template, 100, &samplers, &engine_config(7)).unwrap();
    assert_eq!(out.metadata.precision, "ieee754_f64");
    assert_eq!(out.assumptions["seed"], serde_json::json!(7));
    assert_eq!(out.result.draws_requested, 100);
    assert!(out
        .result
        .draws
        .iter()
        .all(|d| d.inputs.interest_rate == dec!(0.06)));
}
