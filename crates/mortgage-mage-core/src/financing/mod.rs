pub mod rate_model;
pub mod terms;

pub use rate_model::{FinancingQuote, FinancingRequest, MortgageRateModel, SecondLienRequest};
pub use terms::{FinancingTerms, LoanTranche};
