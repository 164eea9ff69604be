//! Error types for the rights ledger
//!
//! Every variant is a local, recoverable rejection surfaced to the
//! immediate caller. None of them leave a ledger partially mutated.

use thiserror::Error;

/// Result type for rights operations
pub type Result<T> = std::result::Result<T, RightsError>;

/// Rights ledger error taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RightsError {
    /// An Amount's brand does not match the brand it is used under
    #[error("the brand in the allegedAmount in 'coerce' didn't match the amountMath brand: expected {expected}, got {actual}")]
    BrandMismatch { expected: String, actual: String },

    /// A raw extent is not acceptable to the brand's math helpers
    #[error("invalid extent for {math_helpers}: {message}")]
    InvalidExtent {
        math_helpers: String,
        message: String,
    },

    /// Subtraction or withdrawal asked for more than is available
    #[error("insufficient extent: {available} is not greater than or equal to {required}")]
    InsufficientExtent { available: String, required: String },

    /// The payment is not live in this issuer's ledger
    #[error("payment not found for {brand}")]
    PaymentNotFound { brand: String },

    /// The caller's expected amount differs from the payment's amount
    #[error("payment balance {actual} must equal amount {expected}")]
    AmountMismatch { expected: String, actual: String },

    /// splitMany amounts do not sum exactly to the payment's amount
    #[error("rights were not conserved: payment holds {available}, proposed {proposed}")]
    RightsNotConserved { available: String, proposed: String },

    /// A pending promise was handed to a purse deposit
    #[error("deposit does not accept promises as first argument. Instead of passing the promise, wait for it to resolve first")]
    PromiseDeposit,

    /// The actor hosting the target has gone away
    #[error("{target} is unavailable: mailbox closed")]
    Unavailable { target: String },
}

impl RightsError {
    pub fn payment_not_found(brand: &crate::Brand) -> Self {
        RightsError::PaymentNotFound {
            brand: brand.get_alleged_name().to_string(),
        }
    }

    pub fn unavailable(target: impl Into<String>) -> Self {
        RightsError::Unavailable {
            target: target.into(),
        }
    }
}
