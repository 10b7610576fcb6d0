//! Transfers and reward transactions.

use crate::{EconomicError, Wallet, WalletId};
use std::time::Duration;

/// Simulated size of every transaction, in bytes.
pub const TRANSACTION_SIZE: u64 = 250;

/// A value transfer between wallets, or a coin-creating reward.
///
/// The amount, parties and creation time never change after construction.
/// Inclusion in a block only records the fee taken and the processing time.
///
/// Constructing a transfer debits the sender immediately; the receiver is
/// credited later, when block assembly settles the transaction. Between the
/// two the amount lives only in the pending pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    amount: f64,
    sender: Option<WalletId>,
    receiver: WalletId,
    created_at: Duration,
    processed_at: Option<Duration>,
    fee: f64,
    size: u64,
}

impl Transaction {
    /// Build a transfer, debiting `sender` by `amount`.
    ///
    /// Fails without touching the sender if the amount is not positive, the
    /// receiver is the sender, or the balance is insufficient.
    pub fn transfer(
        sender: &mut Wallet,
        receiver: WalletId,
        amount: f64,
        now: Duration,
    ) -> Result<Self, EconomicError> {
        if sender.id() == receiver {
            return Err(EconomicError::SelfTransfer(receiver));
        }
        sender.debit(amount)?;

        Ok(Self {
            amount,
            sender: Some(sender.id()),
            receiver,
            created_at: now,
            processed_at: None,
            fee: 0.0,
            size: TRANSACTION_SIZE,
        })
    }

    /// Build a coin-creating reward transaction (no sender).
    pub fn reward(receiver: WalletId, amount: f64, now: Duration) -> Result<Self, EconomicError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EconomicError::NonPositiveAmount(amount));
        }

        Ok(Self {
            amount,
            sender: None,
            receiver,
            created_at: now,
            processed_at: None,
            fee: 0.0,
            size: TRANSACTION_SIZE,
        })
    }

    /// Amount as constructed, before any fee.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Amount the receiver is credited: the constructed amount minus the fee.
    pub fn net_amount(&self) -> f64 {
        self.amount - self.fee
    }

    pub fn fee(&self) -> f64 {
        self.fee
    }

    pub fn sender(&self) -> Option<WalletId> {
        self.sender
    }

    pub fn receiver(&self) -> WalletId {
        self.receiver
    }

    /// Whether this is a transfer (has a sender) rather than a reward.
    pub fn is_transfer(&self) -> bool {
        self.sender.is_some()
    }

    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    /// Set once the transaction is included in a block.
    pub fn processed_at(&self) -> Option<Duration> {
        self.processed_at
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Record inclusion in a block: take `fee` out of the amount and stamp
    /// the processing time. Returns the amount to credit the receiver.
    pub fn settle(&mut self, fee: f64, now: Duration) -> Result<f64, EconomicError> {
        if fee < 0.0 || self.amount - fee < 0.0 {
            return Err(EconomicError::NegativeAfterFee {
                amount: self.amount,
                fee,
            });
        }
        self.fee = fee;
        self.processed_at = Some(now);
        Ok(self.net_amount())
    }
}
