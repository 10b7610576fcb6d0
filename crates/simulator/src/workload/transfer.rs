//! Wallet-to-wallet transfer workload generator.

use crate::accounts::WalletPool;
use crate::config::{WalletSelection, WorkloadConfig};
use powsim_core::TransactionSource;
use powsim_types::{EconomicError, Transaction, WalletSet};
use rand::{Rng, RngCore};
use std::time::Duration;
use tracing::trace;

/// Generates a fixed number of transfers, one per interval.
///
/// Each transfer moves a random share (up to `max_fraction`) of a funded
/// sender's balance to a different wallet. Ticks with no funded wallet
/// produce nothing and do not count toward the total.
pub struct TransferWorkload {
    pool: WalletPool,

    /// Sender selection mode.
    selection: WalletSelection,

    /// Largest share of the sender's balance per transfer.
    max_fraction: f64,

    remaining: u64,

    interval: Duration,

    generated: u64,

    /// Ticks skipped because no wallet was funded.
    idle_ticks: u64,
}

impl TransferWorkload {
    /// Create a generator of `count` transfers over `wallet_count` wallets.
    pub fn new(count: u64, interval: Duration, wallet_count: usize) -> Self {
        let defaults = WorkloadConfig::default();
        Self {
            pool: WalletPool::new(wallet_count),
            selection: defaults.selection,
            max_fraction: defaults.max_fraction,
            remaining: count,
            interval,
            generated: 0,
            idle_ticks: 0,
        }
    }

    /// Apply selection mode and amount bound from `config`.
    pub fn with_config(mut self, config: &WorkloadConfig) -> Self {
        self.selection = config.selection;
        self.max_fraction = config.max_fraction.clamp(f64::EPSILON, 1.0);
        self
    }

    /// Transfers produced so far.
    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn idle_ticks(&self) -> u64 {
        self.idle_ticks
    }

    pub fn pool(&self) -> &WalletPool {
        &self.pool
    }
}

impl TransactionSource for TransferWorkload {
    fn next_transaction(
        &mut self,
        wallets: &mut WalletSet,
        now: Duration,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Transaction>, EconomicError> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let Some(sender) = self.pool.select_sender(wallets, self.selection, &mut *rng) else {
            self.idle_ticks += 1;
            trace!(?now, "No funded wallet, skipping transfer");
            return Ok(None);
        };
        let Some(receiver) = self.pool.select_receiver(sender, wallets.len(), &mut *rng) else {
            self.idle_ticks += 1;
            return Ok(None);
        };

        let balance = wallets.get(sender)?.balance();
        let fraction = rng.gen_range(f64::EPSILON..=self.max_fraction);
        let amount = balance * fraction;
        if amount <= 0.0 {
            self.idle_ticks += 1;
            return Ok(None);
        }

        let tx = Transaction::transfer(wallets.get_mut(sender)?, receiver, amount, now)?;
        self.remaining -= 1;
        self.generated += 1;
        trace!(%sender, %receiver, amount, "Transfer generated");
        Ok(Some(tx))
    }

    fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powsim_types::WalletId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generates_until_exhausted() {
        let mut wallets = WalletSet::new(4, 100.0);
        let mut workload = TransferWorkload::new(3, Duration::from_secs(10), 4);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for i in 0..3 {
            assert!(!workload.is_exhausted());
            let tx = workload
                .next_transaction(&mut wallets, Duration::from_secs(i), &mut rng)
                .unwrap()
                .unwrap();
            assert!(tx.amount() > 0.0);
            assert!(tx.amount() <= 100.0 * 0.5);
            assert_ne!(tx.sender(), Some(tx.receiver()));
        }
        assert!(workload.is_exhausted());
        assert_eq!(workload.generated(), 3);
        assert_eq!(
            workload
                .next_transaction(&mut wallets, Duration::ZERO, &mut rng)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_sender_is_debited() {
        let mut wallets = WalletSet::new(2, 10.0);
        let mut workload = TransferWorkload::new(1, Duration::from_secs(1), 2)
            .with_config(&WorkloadConfig::default().with_max_fraction(1.0));
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let tx = workload
            .next_transaction(&mut wallets, Duration::ZERO, &mut rng)
            .unwrap()
            .unwrap();
        let sender = tx.sender().unwrap();
        let remaining = wallets.get(sender).unwrap().balance();
        assert!((remaining + tx.amount() - 10.0).abs() < 1e-9);
        assert_eq!(wallets.get(tx.receiver()).unwrap().balance(), 10.0);
    }

    #[test]
    fn test_idle_without_funds() {
        let mut wallets = WalletSet::new(3, 0.0);
        let mut workload = TransferWorkload::new(5, Duration::from_secs(1), 3);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let tx = workload
            .next_transaction(&mut wallets, Duration::ZERO, &mut rng)
            .unwrap();
        assert!(tx.is_none());
        assert_eq!(workload.idle_ticks(), 1);
        assert!(!workload.is_exhausted());
        assert!(wallets.get(WalletId(0)).unwrap().outbound_count() == 0);
    }
}
