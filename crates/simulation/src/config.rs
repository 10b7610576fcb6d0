//! Run configuration for the simulation engine.

use powsim_difficulty::{DifficultyConfig, DifficultyError};
use powsim_mempool::{LedgerConfig, LedgerError};
use powsim_mining::HashrateDistribution;
use powsim_network::{NetworkConfig, TopologyError};
use std::time::Duration;
use thiserror::Error;

/// Everything one run needs. Immutable once the runner is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub network: NetworkConfig,

    pub miners: usize,

    /// How network hashrate is divided between miners.
    pub hashrate: HashrateDistribution,

    pub wallets: usize,

    /// Balance every wallet starts with. Counted as genesis issuance.
    pub initial_balance: f64,

    pub ledger: LedgerConfig,

    pub difficulty: DifficultyConfig,

    /// Stop once this many blocks are finalized.
    pub block_limit: Option<u64>,

    /// Stop once virtual time passes this.
    pub duration: Option<Duration>,

    /// Stop once the transaction source is exhausted and the pool is drained.
    pub transaction_mode: bool,

    /// Seed for the single RNG that drives topology, miners, draws and workload.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            miners: 5,
            hashrate: HashrateDistribution::Fixed { total: 10_000 },
            wallets: 10,
            initial_balance: 0.0,
            ledger: LedgerConfig::default(),
            difficulty: DifficultyConfig::new(Duration::from_secs(100), 10),
            block_limit: None,
            duration: Some(Duration::from_secs(365 * 24 * 3600)),
            transaction_mode: false,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_miners(mut self, miners: usize, hashrate: HashrateDistribution) -> Self {
        self.miners = miners;
        self.hashrate = hashrate;
        self
    }

    pub fn with_wallets(mut self, wallets: usize, initial_balance: f64) -> Self {
        self.wallets = wallets;
        self.initial_balance = initial_balance;
        self
    }

    pub fn with_ledger(mut self, ledger: LedgerConfig) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_difficulty(mut self, difficulty: DifficultyConfig) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_block_limit(mut self, block_limit: Option<u64>) -> Self {
        self.block_limit = block_limit;
        self
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_transaction_mode(mut self, transaction_mode: bool) -> Self {
        self.transaction_mode = transaction_mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations that cannot run or cannot end.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        self.ledger.validate()?;
        self.difficulty.validate()?;

        if self.miners == 0 {
            return Err(ConfigError::NoMiners);
        }
        if self.miners > self.wallets {
            return Err(ConfigError::MoreMinersThanWallets {
                miners: self.miners,
                wallets: self.wallets,
            });
        }
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(ConfigError::InvalidInitialBalance(self.initial_balance));
        }

        let bounded = self.block_limit.is_some() || self.duration.is_some();
        if !bounded && !self.transaction_mode {
            return Err(ConfigError::NoTermination);
        }
        // Every block starts with its reward at the head of the pool, so a
        // one-transaction block never reaches a queued transfer.
        if !bounded && self.ledger.block_capacity < 2 {
            return Err(ConfigError::UndrainablePool {
                capacity: self.ledger.block_capacity,
            });
        }
        Ok(())
    }
}

/// Configuration problems, reported before virtual time advances.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no termination criterion: set a block limit, a duration or transaction mode")]
    NoTermination,

    #[error("at least one miner is required")]
    NoMiners,

    #[error("{miners} miners need distinct wallets but only {wallets} are configured")]
    MoreMinersThanWallets { miners: usize, wallets: usize },

    #[error("initial wallet balance {0} must be non-negative")]
    InvalidInitialBalance(f64),

    #[error("block capacity {capacity} cannot drain transfers behind the reward")]
    UndrainablePool { capacity: usize },

    #[error("transaction mode needs a transaction source")]
    MissingTransactionSource,

    #[error("transaction interval must be greater than zero")]
    ZeroTransactionInterval,

    #[error("network: {0}")]
    Network(#[from] TopologyError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("difficulty: {0}")]
    Difficulty(#[from] DifficultyError),
}
