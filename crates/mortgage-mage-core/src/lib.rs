pub mod analysis;
pub mod config;
pub mod error;
pub mod financing;
pub mod metrics;
pub mod proforma;
pub mod rates;
pub mod time_value;
pub mod types;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::MortgageMageError;
pub use types::*;

/// Standard result type for all mortgage-mage operations
pub type MortgageMageResult<T> = Result<T, MortgageMageError>;
