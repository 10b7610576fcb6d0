//! Read-only state exposed after each finalized block.

use powsim_types::{BlockId, NodeIndex};
use std::time::Duration;

/// Chain-wide counters after a block is finalized and propagated.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    /// Simulation time when the snapshot was taken.
    pub now: Duration,
    /// Identity of the block just finalized.
    pub block: BlockId,
    /// Difficulty that will apply to the next round.
    pub difficulty: f64,
    /// Blocks finalized so far.
    pub total_blocks: u64,
    /// Transactions included in finalized blocks so far.
    pub total_transactions: u64,
    /// Coin issued so far.
    pub coin_supply: f64,
    /// Fees taken from transfers so far.
    pub total_fees: f64,
    /// Transactions waiting in the pool.
    pub pool_size: usize,
    /// Winning draw for this block.
    pub mining_time: Duration,
    /// Mining plus propagation time for this block.
    pub total_time: Duration,
    /// Sum of every network hashrate.
    pub total_hashrate: u64,
}

/// Per-node network counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub node: NodeIndex,
    /// Block sends issued so far.
    pub io_requests: u64,
    /// Bytes broadcast so far.
    pub bytes_broadcast: u64,
    /// Broadcast time this node accumulated for the latest block.
    pub last_broadcast_time: Duration,
}
