//! Mining competition.
//!
//! Every round each miner draws an exponentially distributed solve time with
//! rate `hashrate / difficulty`; the smallest draw wins and the scheduler
//! advances by exactly that draw.

mod error;
mod miner;
mod race;

pub use error::MiningError;
pub use miner::{build_miners, total_hashrate, HashrateDistribution, Miner};
pub use race::{MiningRace, RaceOutcome};
