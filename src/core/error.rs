use thiserror::Error;

/// Validation failures of the allocation and valuation core.
///
/// Every failure is fatal to the run: the inputs are fixed, so retrying yields the same error.
#[derive(Debug, Error)]
pub enum Error {
    /// The series cannot be reconciled to one timestamp index.
    #[error("cannot align the series: {0}")]
    Alignment(String),

    /// A price window contains no prices.
    #[error("no spot prices fall into the window {window}")]
    InsufficientData { window: String },

    /// Weights of a group do not sum up to one.
    #[error("weights of `{group}` sum up to {sum}, expected 1")]
    InvalidWeight { group: String, sum: f64 },

    /// Negative or non-finite energy or price values, or an invalid parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
