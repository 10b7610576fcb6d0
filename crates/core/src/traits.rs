//! Seams for collaborators outside the engine.

use crate::{ChainSnapshot, NodeSnapshot};
use powsim_types::{EconomicError, Transaction, WalletSet};
use rand::RngCore;
use std::time::Duration;

/// Receives the observability view after every finalized block.
///
/// Observers only read; the runner never consults them for decisions.
///
/// # Example
///
/// ```ignore
/// struct Printer;
///
/// impl BlockObserver for Printer {
///     fn on_block(&mut self, chain: &ChainSnapshot, _nodes: &[NodeSnapshot]) {
///         println!("{} at {:?}", chain.block, chain.now);
///     }
/// }
/// ```
pub trait BlockObserver {
    /// Called once per finalized block, after its propagation completes.
    fn on_block(&mut self, chain: &ChainSnapshot, nodes: &[NodeSnapshot]);
}

/// Produces transfers for the transaction generator process.
///
/// The generator calls [`next_transaction`](Self::next_transaction) once per
/// interval until [`is_exhausted`](Self::is_exhausted) reports true.
pub trait TransactionSource {
    /// Build the next transfer, debiting its sender.
    ///
    /// Returns `Ok(None)` when no transfer can be built this tick (for
    /// example, no wallet is funded yet). Errors are invariant violations
    /// and abort the run.
    fn next_transaction(
        &mut self,
        wallets: &mut WalletSet,
        now: Duration,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Transaction>, EconomicError>;

    /// Whether the source has produced everything it was asked to.
    fn is_exhausted(&self) -> bool;

    /// Time between generator ticks.
    fn interval(&self) -> Duration;
}
