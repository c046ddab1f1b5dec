use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use mortgage_mage_core::config::{AggregatorConfig, EngineConfig};
use mortgage_mage_core::financing::{
    FinancingRequest, FinancingTerms, MortgageRateModel, SecondLienRequest,
};
use mortgage_mage_core::proforma::PropertyScenario;
use mortgage_mage_core::rates::{RateAggregator, RateDistribution, RetryingSource, StaticRateSource};
use mortgage_mage_core::Rate;

use super::document;

/// A deal as read from disk. Financing is either given outright or priced
/// from a quotes file.
#[derive(Debug, Clone, Deserialize)]
pub struct DealFile {
    pub scenario: PropertyScenario,
    #[serde(default)]
    pub financing: Option<FinancingTerms>,
    /// Carved out of the loan amount when financing is priced from quotes
    #[serde(default)]
    pub second_lien: Option<SecondLienRequest>,
    #[serde(default)]
    pub hurdle_rate: Option<Rate>,
}

/// Read `--input` (JSON or YAML) or piped JSON into a typed struct.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    match path {
        Some(p) => document::load(p),
        None => match document::load_piped()? {
            Some(value) => Ok(value),
            None => Err(format!("--input <file> or JSON on stdin required for {what}").into()),
        },
    }
}

/// Aggregator over the sources in a quotes file (a JSON array of
/// `{source_id, quotes}` objects).
pub fn load_aggregator(
    quotes_path: &str,
    as_of: Option<&str>,
    config: &AggregatorConfig,
) -> Result<RateAggregator, Box<dyn std::error::Error>> {
    let sources: Vec<StaticRateSource> = document::load(quotes_path)?;
    let mut aggregator = RateAggregator::new(config.clone(), parse_as_of(as_of)?)?;
    for source in sources {
        aggregator.add_source(Box::new(RetryingSource::new(source)));
    }
    Ok(aggregator)
}

pub fn parse_as_of(as_of: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match as_of {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .map_err(|e| format!("Invalid --as-of '{s}': {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

/// First lien funds the price less the down payment and any second lien.
pub fn financing_request(deal: &DealFile) -> FinancingRequest {
    let scenario = &deal.scenario;
    let second = deal.second_lien.as_ref().map(|s| s.amount).unwrap_or_default();
    FinancingRequest {
        loan_amount: scenario.loan_amount() - second,
        property_value: scenario.purchase_price,
        second_lien: deal.second_lien.clone(),
        amortization_periods: None,
    }
}

/// Financing for the deal plus, when priced from quotes, the first-lien
/// rate distribution behind it.
pub fn resolve_financing(
    deal: &DealFile,
    quotes: Option<&str>,
    as_of: Option<&str>,
    config: &EngineConfig,
) -> Result<(FinancingTerms, Option<RateDistribution>), Box<dyn std::error::Error>> {
    match (quotes, &deal.financing) {
        (Some(path), _) => {
            let aggregator = load_aggregator(path, as_of, &config.aggregator)?;
            let model = MortgageRateModel::new(&aggregator, config.rate_model.clone())?;
            let quote = model.quote(&financing_request(deal))?;
            Ok((quote.terms, Some(quote.first_lien_rates)))
        }
        (None, Some(terms)) => Ok((terms.clone(), None)),
        (None, None) => {
            Err("deal has no \"financing\" section; pass --quotes <file.json> to price it".into())
        }
    }
}
