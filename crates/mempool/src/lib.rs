//! Pending transactions and block assembly.
//!
//! The [`Ledger`] owns the FIFO [`TxPool`], the block currently being
//! assembled and the finalized history. Each mined block is finalized
//! (pool drained into it under the capacity cap, receivers credited) and
//! replaced by a fresh block whose first transaction rewards the winner.

mod config;
mod error;
mod ledger;
mod pool;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::Ledger;
pub use pool::TxPool;
