use thiserror::Error;

/// Errors from miner construction and the mining race.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiningError {
    #[error("at least one miner is required")]
    NoMiners,

    #[error("miners need at least one node to announce through")]
    NoNodes,

    #[error("{miners} miners need distinct wallets but only {wallets} exist")]
    NotEnoughWallets { miners: usize, wallets: usize },

    #[error("difficulty must be positive and finite, got {0}")]
    InvalidDifficulty(f64),
}
