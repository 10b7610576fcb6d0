//! Ledger configuration.

use crate::LedgerError;

/// Block assembly and reward parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Maximum transactions per block.
    pub block_capacity: usize,

    /// Subsidy paid for a block before any halving.
    pub base_reward: f64,

    /// Blocks between reward halvings. Zero never halves.
    pub halving_interval: u64,

    /// Fraction of each transfer taken as fee, in `[0, 1]`.
    pub fee_rate: f64,

    /// Finalized blocks kept before the oldest half is pruned.
    pub max_history: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            block_capacity: 100,
            base_reward: 50.0,
            halving_interval: 210_000,
            fee_rate: 0.0,
            max_history: 4096,
        }
    }
}

impl LedgerConfig {
    pub fn with_block_capacity(mut self, block_capacity: usize) -> Self {
        self.block_capacity = block_capacity;
        self
    }

    pub fn with_reward(mut self, base_reward: f64, halving_interval: u64) -> Self {
        self.base_reward = base_reward;
        self.halving_interval = halving_interval;
        self
    }

    pub fn with_fee_rate(mut self, fee_rate: f64) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.block_capacity == 0 {
            return Err(LedgerError::ZeroCapacity);
        }
        if !(0.0..=1.0).contains(&self.fee_rate) {
            return Err(LedgerError::InvalidFeeRate(self.fee_rate));
        }
        if !self.base_reward.is_finite() || self.base_reward < 0.0 {
            return Err(LedgerError::InvalidReward(self.base_reward));
        }
        Ok(())
    }

    /// Subsidy for a block created after `total_blocks` blocks were finalized.
    pub fn subsidy(&self, total_blocks: u64) -> f64 {
        if self.halving_interval == 0 {
            return self.base_reward;
        }
        let halvings = total_blocks / self.halving_interval;
        // Past 64 halvings the subsidy is below any representable fraction.
        if halvings >= 64 {
            return 0.0;
        }
        self.base_reward * 0.5f64.powi(halvings as i32)
    }
}
