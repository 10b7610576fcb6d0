//! FIFO pool of pending transactions.

use powsim_types::Transaction;
use std::collections::VecDeque;

/// Pending transactions in arrival order. Rewards jump the queue.
#[derive(Debug, Clone, Default)]
pub struct TxPool {
    pending: VecDeque<Transaction>,
}

impl TxPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transaction behind everything pending.
    pub fn push_back(&mut self, tx: Transaction) {
        self.pending.push_back(tx);
    }

    /// Queue a transaction ahead of everything pending.
    pub fn push_front(&mut self, tx: Transaction) {
        self.pending.push_front(tx);
    }

    pub fn pop_front(&mut self) -> Option<Transaction> {
        self.pending.pop_front()
    }

    pub fn front(&self) -> Option<&Transaction> {
        self.pending.front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.pending.iter()
    }

    /// Sum of pending amounts (already debited from senders, or not yet issued).
    pub fn pending_amount(&self) -> f64 {
        self.pending.iter().map(Transaction::amount).sum()
    }
}
