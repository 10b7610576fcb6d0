//! Blocks and the header view used for propagation.

use crate::{BlockId, CapacityError, Transaction};
use std::time::Duration;

/// Simulated size of a block header, in bytes.
pub const BLOCK_HEADER_SIZE: u64 = 80;

/// The fields two blocks must share to be considered the same block.
///
/// This is what travels through the peer graph and what nodes hold as
/// their tip. Equality is deliberately conservative: identity, timestamp,
/// elapsed time, transaction count and size must all match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block identity (chain position).
    pub id: BlockId,

    /// Simulation time at which the block was created.
    pub timestamp: Duration,

    /// Time between the previous block's creation and this one's.
    pub since_previous: Duration,

    /// Number of included transactions.
    pub transaction_count: usize,

    /// Header size plus the size of every transaction, in bytes.
    pub size: u64,
}

/// A block under assembly or finalized.
///
/// Owns its transactions. Filling stops at `capacity` transactions; the
/// block reports itself full from then on.
#[derive(Debug, Clone)]
pub struct Block {
    id: BlockId,
    timestamp: Duration,
    since_previous: Duration,
    transactions: Vec<Transaction>,
    size: u64,
    capacity: usize,
    full: bool,
    fees: f64,
}

impl Block {
    /// Create an empty block.
    pub fn new(id: BlockId, timestamp: Duration, since_previous: Duration, capacity: usize) -> Self {
        Self {
            id,
            timestamp,
            since_previous,
            transactions: Vec::new(),
            size: BLOCK_HEADER_SIZE,
            capacity,
            full: capacity == 0,
            fees: 0.0,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn since_previous(&self) -> Duration {
        self.since_previous
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Maximum number of transactions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Total fees taken from included transfers.
    pub fn fees(&self) -> f64 {
        self.fees
    }

    /// Append a settled transaction, charging `fee` to the block's fee total.
    pub fn push(&mut self, tx: Transaction, fee: f64) -> Result<(), CapacityError> {
        if self.full {
            return Err(CapacityError::BlockFull {
                block: self.id,
                capacity: self.capacity,
            });
        }

        self.size += tx.size();
        self.fees += fee;
        self.transactions.push(tx);
        if self.transactions.len() >= self.capacity {
            self.full = true;
        }
        Ok(())
    }

    /// The equality-relevant view of this block.
    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            id: self.id,
            timestamp: self.timestamp,
            since_previous: self.since_previous,
            transaction_count: self.transactions.len(),
            size: self.size,
        }
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header() == other.header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WalletId, TRANSACTION_SIZE};

    fn reward(amount: f64) -> Transaction {
        Transaction::reward(WalletId(0), amount, Duration::ZERO).unwrap()
    }

    #[test]
    fn test_block_fills_at_capacity() {
        let mut block = Block::new(BlockId(0), Duration::ZERO, Duration::ZERO, 2);
        block.push(reward(1.0), 0.0).unwrap();
        assert!(!block.is_full());
        block.push(reward(1.0), 0.0).unwrap();
        assert!(block.is_full());

        let err = block.push(reward(1.0), 0.0).unwrap_err();
        assert_eq!(
            err,
            CapacityError::BlockFull {
                block: BlockId(0),
                capacity: 2
            }
        );
        assert_eq!(block.transaction_count(), 2);
    }

    #[test]
    fn test_size_includes_header() {
        let mut block = Block::new(BlockId(3), Duration::ZERO, Duration::ZERO, 10);
        assert_eq!(block.size(), BLOCK_HEADER_SIZE);
        block.push(reward(1.0), 0.5).unwrap();
        assert_eq!(block.size(), BLOCK_HEADER_SIZE + TRANSACTION_SIZE);
        assert_eq!(block.fees(), 0.5);
    }

    #[test]
    fn test_equality_uses_header_fields() {
        let a = Block::new(BlockId(1), Duration::from_secs(5), Duration::from_secs(5), 10);
        let b = Block::new(BlockId(1), Duration::from_secs(5), Duration::from_secs(5), 20);
        let c = Block::new(BlockId(1), Duration::from_secs(6), Duration::from_secs(5), 10);

        // Capacity is not part of identity.
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
