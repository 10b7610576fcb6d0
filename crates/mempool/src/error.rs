use powsim_types::{CapacityError, EconomicError};
use thiserror::Error;

/// Errors from block assembly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("block capacity must be at least one transaction")]
    ZeroCapacity,

    #[error("fee rate {0} is outside [0, 1]")]
    InvalidFeeRate(f64),

    #[error("base reward {0} must be non-negative")]
    InvalidReward(f64),

    #[error(transparent)]
    Economic(#[from] EconomicError),

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}
