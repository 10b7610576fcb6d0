//! Core types for the proof-of-work network simulator.
//!
//! Everything here is plain data plus the invariants that protect it:
//!
//! - [`Wallet`] / [`WalletSet`]: balances that can never go negative
//! - [`Transaction`]: transfers debit their sender at construction
//! - [`Block`] / [`BlockHeader`]: capacity-bounded containers with the
//!   conservative equality used for duplicate suppression
//!
//! Components refer to each other through index types ([`NodeIndex`],
//! [`WalletId`], ...), never through references.

mod block;
mod error;
mod identifiers;
mod transaction;
mod wallet;

pub use block::{Block, BlockHeader, BLOCK_HEADER_SIZE};
pub use error::{CapacityError, EconomicError};
pub use identifiers::{BlockId, MinerId, NodeIndex, WalletId};
pub use transaction::{Transaction, TRANSACTION_SIZE};
pub use wallet::{Wallet, WalletSet};
