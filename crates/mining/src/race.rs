//! The per-block mining race.

use crate::{Miner, MiningError};
use powsim_types::MinerId;
use rand::Rng;
use std::time::Duration;
use tracing::{trace, warn};

/// Result of one mining round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceOutcome {
    pub miner: MinerId,
    /// Position of the winner in the miner list.
    pub index: usize,
    /// Winning draw; the clock advances by exactly this much.
    pub mining_time: Duration,
}

/// Runs mining rounds and tallies wins per miner.
#[derive(Debug, Clone, Default)]
pub struct MiningRace {
    rounds: u64,
    wins: Vec<u64>,
}

impl MiningRace {
    pub fn new(miner_count: usize) -> Self {
        Self {
            rounds: 0,
            wins: vec![0; miner_count],
        }
    }

    /// Rounds that produced a winner.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Wins per miner, in miner-list order.
    pub fn wins(&self) -> &[u64] {
        &self.wins
    }

    /// Draw a solve time for every miner and pick the smallest.
    ///
    /// Ties go to the miner listed first. Returns `None` when no miner can
    /// win (every hashrate is zero).
    pub fn draw(
        &mut self,
        miners: &[Miner],
        difficulty: f64,
        rng: &mut impl Rng,
    ) -> Result<Option<RaceOutcome>, MiningError> {
        if !difficulty.is_finite() || difficulty <= 0.0 {
            return Err(MiningError::InvalidDifficulty(difficulty));
        }

        let mut best: Option<RaceOutcome> = None;
        for (index, miner) in miners.iter().enumerate() {
            let Some(mining_time) = solve_time(miner.hashrate(), difficulty, rng) else {
                continue;
            };
            trace!(miner = %miner.id(), ?mining_time, "Mining draw");
            if best.map_or(true, |b| mining_time < b.mining_time) {
                best = Some(RaceOutcome {
                    miner: miner.id(),
                    index,
                    mining_time,
                });
            }
        }

        if let Some(outcome) = best {
            self.rounds += 1;
            if self.wins.len() <= outcome.index {
                self.wins.resize(outcome.index + 1, 0);
            }
            self.wins[outcome.index] += 1;
        }
        Ok(best)
    }
}

/// Exponential solve time with rate `hashrate / difficulty` per second.
///
/// Inverse-transform sampling: `mean * -ln(1 - u)` for uniform `u` in [0, 1).
fn solve_time(hashrate: u64, difficulty: f64, rng: &mut impl Rng) -> Option<Duration> {
    if hashrate == 0 {
        return None;
    }
    let mean = difficulty / hashrate as f64;
    let u: f64 = rng.gen();
    let secs = mean * (1.0 - u).ln().abs();
    match Duration::try_from_secs_f64(secs) {
        Ok(time) => Some(time),
        Err(_) => {
            warn!(hashrate, difficulty, secs, "Solve time out of range, miner skipped");
            None
        }
    }
}
