//! Wallets and the wallet arena.

use crate::{EconomicError, WalletId};

/// A balance holder.
///
/// The balance is never negative: debits that would overdraw are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Wallet {
    id: WalletId,
    balance: f64,
    outbound: u64,
    inbound: u64,
}

impl Wallet {
    /// Create an empty wallet.
    pub fn new(id: WalletId) -> Self {
        Self::with_balance(id, 0.0)
    }

    /// Create a wallet holding an initial balance.
    pub fn with_balance(id: WalletId, balance: f64) -> Self {
        Self {
            id,
            balance: balance.max(0.0),
            outbound: 0,
            inbound: 0,
        }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Number of transfers this wallet has sent.
    pub fn outbound_count(&self) -> u64 {
        self.outbound
    }

    /// Number of transactions credited to this wallet.
    pub fn inbound_count(&self) -> u64 {
        self.inbound
    }

    /// Remove `amount` for an outgoing transfer.
    pub fn debit(&mut self, amount: f64) -> Result<(), EconomicError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EconomicError::NonPositiveAmount(amount));
        }
        if amount > self.balance {
            return Err(EconomicError::InsufficientBalance {
                wallet: self.id,
                balance: self.balance,
                amount,
            });
        }
        self.balance -= amount;
        self.outbound += 1;
        Ok(())
    }

    /// Add an incoming amount. Zero credits (fully fee-consumed transfers)
    /// still count as an inbound transaction.
    pub fn credit(&mut self, amount: f64) {
        debug_assert!(amount >= 0.0, "credit must not be negative");
        self.balance += amount;
        self.inbound += 1;
    }
}

/// Arena of all wallets in a run, addressed by [`WalletId`].
#[derive(Debug, Clone, Default)]
pub struct WalletSet {
    wallets: Vec<Wallet>,
}

impl WalletSet {
    /// Create `count` wallets, each holding `initial_balance`.
    pub fn new(count: usize, initial_balance: f64) -> Self {
        let wallets = (0..count)
            .map(|i| Wallet::with_balance(WalletId(i as u32), initial_balance))
            .collect();
        Self { wallets }
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn get(&self, id: WalletId) -> Result<&Wallet, EconomicError> {
        self.wallets
            .get(id.as_usize())
            .ok_or(EconomicError::UnknownWallet(id))
    }

    pub fn get_mut(&mut self, id: WalletId) -> Result<&mut Wallet, EconomicError> {
        self.wallets
            .get_mut(id.as_usize())
            .ok_or(EconomicError::UnknownWallet(id))
    }

    pub fn contains(&self, id: WalletId) -> bool {
        id.as_usize() < self.wallets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.iter()
    }

    /// Sum of every balance.
    pub fn total_balance(&self) -> f64 {
        self.wallets.iter().map(Wallet::balance).sum()
    }

    /// Ids of wallets that can currently fund a transfer.
    pub fn funded(&self) -> impl Iterator<Item = WalletId> + '_ {
        self.wallets
            .iter()
            .filter(|w| w.balance > 0.0)
            .map(Wallet::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_rejects_overdraw() {
        let mut wallet = Wallet::with_balance(WalletId(0), 10.0);
        let err = wallet.debit(10.5).unwrap_err();
        assert!(matches!(err, EconomicError::InsufficientBalance { .. }));
        assert_eq!(wallet.balance(), 10.0);
        assert_eq!(wallet.outbound_count(), 0);
    }

    #[test]
    fn test_debit_rejects_non_positive() {
        let mut wallet = Wallet::with_balance(WalletId(0), 10.0);
        assert_eq!(
            wallet.debit(0.0),
            Err(EconomicError::NonPositiveAmount(0.0))
        );
        assert!(wallet.debit(-1.0).is_err());
        assert!(wallet.debit(f64::NAN).is_err());
    }

    #[test]
    fn test_debit_entire_balance() {
        let mut wallet = Wallet::with_balance(WalletId(0), 10.0);
        wallet.debit(10.0).unwrap();
        assert_eq!(wallet.balance(), 0.0);
        assert_eq!(wallet.outbound_count(), 1);
    }

    #[test]
    fn test_wallet_set_lookup() {
        let mut wallets = WalletSet::new(3, 5.0);
        assert_eq!(wallets.total_balance(), 15.0);
        wallets.get_mut(WalletId(1)).unwrap().credit(2.0);
        assert_eq!(wallets.get(WalletId(1)).unwrap().balance(), 7.0);
        assert_eq!(
            wallets.get(WalletId(3)).unwrap_err(),
            EconomicError::UnknownWallet(WalletId(3))
        );
    }

    #[test]
    fn test_funded_skips_empty_wallets() {
        let mut wallets = WalletSet::new(3, 0.0);
        wallets.get_mut(WalletId(2)).unwrap().credit(1.0);
        let funded: Vec<_> = wallets.funded().collect();
        assert_eq!(funded, vec![WalletId(2)]);
    }
}
