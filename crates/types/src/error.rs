//! Invariant violations in the simulated economy.
//!
//! None of these are recoverable: a run that hits one has an economically
//! inconsistent ledger and is aborted by the runner.

use crate::{BlockId, WalletId};
use thiserror::Error;

/// Violations of the coin and transaction invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EconomicError {
    /// Transaction amounts must be strictly positive (and finite).
    #[error("transaction amount must be positive, got {0}")]
    NonPositiveAmount(f64),

    /// A wallet cannot pay itself.
    #[error("{0} cannot send a transaction to itself")]
    SelfTransfer(WalletId),

    /// Sender cannot cover the amount.
    #[error("{wallet} has balance {balance} but tried to send {amount}")]
    InsufficientBalance {
        wallet: WalletId,
        balance: f64,
        amount: f64,
    },

    /// Fee deduction would leave a negative amount.
    #[error("fee {fee} exceeds transaction amount {amount}")]
    NegativeAfterFee { amount: f64, fee: f64 },

    /// Wallet index outside the wallet arena.
    #[error("unknown {0}")]
    UnknownWallet(WalletId),
}

/// Violations of block capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// Block assembly tried to add past the configured capacity.
    #[error("{block} is full ({capacity} transactions)")]
    BlockFull { block: BlockId, capacity: usize },
}
