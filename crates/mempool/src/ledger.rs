//! Block assembly, rewards and fee accounting.

use crate::{LedgerConfig, LedgerError, TxPool};
use powsim_types::{Block, BlockHeader, BlockId, Transaction, WalletId, WalletSet};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace};

/// The chain's economic state: finalized history, the block under assembly
/// and the pending pool.
///
/// Fees taken from transfers are not burned. They are held until the next
/// reward transaction carries them to the winning miner, so coin supply only
/// grows by subsidy and genesis allocations:
///
/// ```text
/// Σ balances + pool.pending_amount() + unrewarded_fees == coin_supply
/// ```
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    history: VecDeque<Block>,
    current: Block,
    pool: TxPool,
    total_blocks: u64,
    total_transactions: u64,
    coin_supply: f64,
    total_fees: f64,
    unrewarded_fees: f64,
    /// Timestamp and fee total of the most recently finalized block.
    last_finalized: Option<(Duration, f64)>,
    stopped: bool,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let current = Block::new(
            BlockId::GENESIS,
            Duration::ZERO,
            Duration::ZERO,
            config.block_capacity,
        );
        Ok(Self {
            config,
            history: VecDeque::new(),
            current,
            pool: TxPool::new(),
            total_blocks: 0,
            total_transactions: 0,
            coin_supply: 0.0,
            total_fees: 0.0,
            unrewarded_fees: 0.0,
            last_finalized: None,
            stopped: false,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The block currently being assembled.
    pub fn current(&self) -> &Block {
        &self.current
    }

    /// Finalized blocks still retained, oldest first.
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &Block> {
        self.history.iter()
    }

    pub fn pool(&self) -> &TxPool {
        &self.pool
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    pub fn total_transactions(&self) -> u64 {
        self.total_transactions
    }

    /// Coins issued so far: subsidies plus genesis allocations.
    pub fn coin_supply(&self) -> f64 {
        self.coin_supply
    }

    /// Fees taken from transfers over the whole run.
    pub fn total_fees(&self) -> f64 {
        self.total_fees
    }

    /// Fees taken but not yet carried by a reward transaction.
    pub fn unrewarded_fees(&self) -> f64 {
        self.unrewarded_fees
    }

    /// Amount currently waiting in the pool.
    pub fn pending_amount(&self) -> f64 {
        self.pool.pending_amount()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Raise the stop flag; the run ends once it is observed.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Account for coins that exist before the first block (initial balances).
    pub fn record_genesis_allocation(&mut self, amount: f64) {
        self.coin_supply += amount;
    }

    /// Queue a transfer behind everything pending.
    pub fn submit(&mut self, tx: Transaction) {
        trace!(amount = tx.amount(), receiver = %tx.receiver(), "Transaction submitted");
        self.pool.push_back(tx);
    }

    /// Drain the pool into the current block, credit receivers and move the
    /// block into history.
    ///
    /// Returns the finalized block's header, which is what gets propagated.
    pub fn finalize_current_block(
        &mut self,
        wallets: &mut WalletSet,
        now: Duration,
    ) -> Result<BlockHeader, LedgerError> {
        while !self.current.is_full() {
            let Some(mut tx) = self.pool.pop_front() else {
                break;
            };
            let fee = if tx.is_transfer() {
                tx.amount() * self.config.fee_rate
            } else {
                0.0
            };
            let credit = tx.settle(fee, now)?;
            wallets.get_mut(tx.receiver())?.credit(credit);
            self.total_fees += fee;
            self.unrewarded_fees += fee;
            self.current.push(tx, fee)?;
        }

        let placeholder = Block::new(
            BlockId(self.total_blocks + 1),
            now,
            Duration::ZERO,
            self.config.block_capacity,
        );
        let block = std::mem::replace(&mut self.current, placeholder);
        let header = block.header();

        self.total_blocks += 1;
        self.total_transactions += block.transaction_count() as u64;
        self.last_finalized = Some((block.timestamp(), block.fees()));
        debug!(
            block = %header.id,
            transactions = header.transaction_count,
            size = header.size,
            fees = block.fees(),
            pool = self.pool.len(),
            "Block finalized"
        );

        self.history.push_back(block);
        self.prune_history();
        Ok(header)
    }

    /// Open the next block at `now` and, with a winner, queue its reward at
    /// the head of the pool.
    ///
    /// The reward is the halved subsidy plus the fees of the block just
    /// finalized. A non-positive reward creates no transaction.
    pub fn create_next_block(
        &mut self,
        now: Duration,
        winner: Option<WalletId>,
    ) -> Result<(), LedgerError> {
        let (since_previous, carried_fees) = match self.last_finalized {
            Some((timestamp, fees)) => (now.saturating_sub(timestamp), fees),
            None => (Duration::ZERO, 0.0),
        };
        self.current = Block::new(
            BlockId(self.total_blocks),
            now,
            since_previous,
            self.config.block_capacity,
        );

        let Some(winner) = winner else {
            return Ok(());
        };
        let subsidy = self.config.subsidy(self.total_blocks);
        let reward = subsidy + carried_fees;
        if reward <= 0.0 {
            return Ok(());
        }

        let tx = Transaction::reward(winner, reward, now)?;
        self.coin_supply += subsidy;
        self.unrewarded_fees -= carried_fees;
        self.pool.push_front(tx);
        trace!(%winner, subsidy, carried_fees, "Reward queued");
        Ok(())
    }

    fn prune_history(&mut self) {
        if self.history.len() > self.config.max_history {
            let drop = self.history.len().div_ceil(2);
            self.history.drain(..drop);
            debug!(dropped = drop, retained = self.history.len(), "History pruned");
        }
    }
}
