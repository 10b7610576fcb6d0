use crate::ConfigError;
use powsim_difficulty::DifficultyError;
use powsim_mempool::LedgerError;
use powsim_mining::MiningError;
use powsim_network::TopologyError;
use powsim_types::{CapacityError, EconomicError, MinerId};
use thiserror::Error;

/// Anything that aborts a run. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("mining: {0}")]
    Mining(#[from] MiningError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("difficulty: {0}")]
    Difficulty(#[from] DifficultyError),

    #[error("economic invariant violated: {0}")]
    Economic(#[from] EconomicError),

    #[error("capacity invariant violated: {0}")]
    Capacity(#[from] CapacityError),

    #[error("block found by unknown miner {0}")]
    UnknownMiner(MinerId),
}
