use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::LienPosition;

#[derive(Debug, Error)]
pub enum MortgageMageError {
    #[error("No rate data: no {lien} lien quotes for LTV bucket {bucket}")]
    NoData { lien: LienPosition, bucket: String },

    #[error("Unreachable LTV {ltv}: {reason}")]
    UnreachableLtv { ltv: Decimal, reason: String },

    #[error("Invalid scenario: {field}: {reason}")]
    InvalidScenario { field: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{function} did not converge after {iterations} iterations (delta: {last_delta})")]
    NoConvergence {
        function: String,
        iterations: u32,
        last_delta: f64,
    },

    #[error("Excessive failure rate: {skipped} of {draws} draws skipped (threshold {threshold})")]
    ExcessiveFailureRate {
        skipped: u32,
        draws: u32,
        threshold: f64,
    },

    #[error("Run timed out after {elapsed_ms} ms with {completed} draws completed")]
    Timeout { elapsed_ms: u64, completed: u32 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MortgageMageError {
    /// Errors confined to a single Monte Carlo draw. These are recorded as
    /// skipped draws instead of aborting the run.
    pub fn is_draw_local(&self) -> bool {
        matches!(
            self,
            MortgageMageError::NoConvergence { .. } | MortgageMageError::InvalidScenario { .. }
        )
    }

    pub(crate) fn invalid_scenario(field: &str, reason: impl Into<String>) -> Self {
        MortgageMageError::InvalidScenario {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MortgageMageError {
    fn from(e: serde_json::Error) -> Self {
        MortgageMageError::SerializationError(e.to_string())
    }
}
