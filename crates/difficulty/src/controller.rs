use crate::{DifficultyConfig, DifficultyError};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{info, warn};

/// Tracks recent block times and rescales difficulty on schedule.
#[derive(Debug, Clone)]
pub struct DifficultyController {
    config: DifficultyConfig,
    difficulty: f64,
    /// Propagation-inclusive block times, newest last.
    total_times: VecDeque<Duration>,
    mining_times: VecDeque<Duration>,
    recorded: u64,
    retargets: u64,
}

impl DifficultyController {
    /// Create a controller for a network of `total_hashrate`.
    ///
    /// Without a fixed difficulty the starting value makes the expected
    /// block time equal the target: `target_secs * total_hashrate`.
    pub fn new(config: DifficultyConfig, total_hashrate: u64) -> Result<Self, DifficultyError> {
        config.validate()?;
        let difficulty = match config.fixed {
            Some(fixed) => fixed,
            None => {
                let initial = config.target_block_time.as_secs_f64() * total_hashrate as f64;
                if initial < 1.0 {
                    warn!(total_hashrate, "No usable hashrate, starting difficulty at 1");
                    1.0
                } else {
                    initial
                }
            }
        };
        Ok(Self {
            total_times: VecDeque::with_capacity(config.interval),
            mining_times: VecDeque::with_capacity(config.interval),
            config,
            difficulty,
            recorded: 0,
            retargets: 0,
        })
    }

    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn is_fixed(&self) -> bool {
        self.config.fixed.is_some()
    }

    pub fn config(&self) -> &DifficultyConfig {
        &self.config
    }

    /// Blocks recorded so far.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    pub fn retargets(&self) -> u64 {
        self.retargets
    }

    /// Mean propagation-inclusive block time over the window.
    pub fn average_block_time(&self) -> Option<Duration> {
        average(&self.total_times)
    }

    /// Mean winning draw over the window.
    pub fn average_mining_time(&self) -> Option<Duration> {
        average(&self.mining_times)
    }

    /// Record one block's times. Returns the new difficulty when this block
    /// triggered a retarget.
    pub fn record(&mut self, mining_time: Duration, total_time: Duration) -> Option<f64> {
        push_capped(&mut self.mining_times, mining_time, self.config.interval);
        push_capped(&mut self.total_times, total_time, self.config.interval);
        self.recorded += 1;

        if self.is_fixed() || self.recorded % self.config.interval as u64 != 0 {
            return None;
        }

        let observed = self.total_times.iter().sum::<Duration>().as_secs_f64()
            / self.config.interval as f64;
        let target = self.config.target_block_time.as_secs_f64();
        let next = (self.difficulty * (target / observed)).ceil();
        if !next.is_finite() || next <= 0.0 {
            warn!(observed, "Skipping retarget, observed block time unusable");
            return None;
        }

        info!(
            block = self.recorded,
            previous = self.difficulty,
            difficulty = next,
            observed_secs = observed,
            target_secs = target,
            "Difficulty retarget"
        );
        self.difficulty = next;
        self.retargets += 1;
        Some(next)
    }
}

fn push_capped(window: &mut VecDeque<Duration>, value: Duration, cap: usize) {
    window.push_back(value);
    while window.len() > cap {
        window.pop_front();
    }
}

fn average(window: &VecDeque<Duration>) -> Option<Duration> {
    if window.is_empty() {
        return None;
    }
    Some(window.iter().sum::<Duration>() / window.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_initial_difficulty_matches_target() {
        let controller =
            DifficultyController::new(DifficultyConfig::new(secs(100), 10), 10_000).unwrap();
        assert_eq!(controller.difficulty(), 1_000_000.0);
    }

    #[test]
    #[traced_test]
    fn test_on_target_is_fixed_point() {
        let mut controller =
            DifficultyController::new(DifficultyConfig::new(secs(100), 10), 10_000).unwrap();
        for _ in 0..30 {
            controller.record(secs(100), secs(100));
        }
        assert_eq!(controller.difficulty(), 1_000_000.0);
        assert_eq!(controller.retargets(), 3);
        assert!(logs_contain("Difficulty retarget"));
    }

    #[test]
    fn test_slow_blocks_lower_difficulty() {
        let mut controller =
            DifficultyController::new(DifficultyConfig::new(secs(100), 4), 10).unwrap();
        for i in 1..=4 {
            let retarget = controller.record(secs(150), secs(200));
            assert_eq!(retarget.is_some(), i == 4);
        }
        assert_eq!(controller.difficulty(), 500.0);
    }

    #[test]
    fn test_fast_blocks_raise_difficulty_rounding_up() {
        let mut controller =
            DifficultyController::new(DifficultyConfig::new(secs(100), 3), 10).unwrap();
        for _ in 0..3 {
            controller.record(secs(20), secs(30));
        }
        // 1000 * 100 / 30 = 3333.33...
        assert_eq!(controller.difficulty(), 3334.0);
    }

    #[test]
    fn test_fixed_difficulty_never_retargets() {
        let config = DifficultyConfig::new(secs(100), 2).with_fixed(42.0);
        let mut controller = DifficultyController::new(config, 10_000).unwrap();
        for _ in 0..10 {
            assert_eq!(controller.record(secs(1), secs(1)), None);
        }
        assert_eq!(controller.difficulty(), 42.0);
        assert!(controller.is_fixed());
    }

    #[test]
    fn test_window_is_bounded() {
        let mut controller =
            DifficultyController::new(DifficultyConfig::new(secs(100), 5), 10).unwrap();
        for i in 0..12 {
            controller.record(secs(i), secs(i));
        }
        // Last five blocks: 7..=11
        assert_eq!(controller.average_block_time(), Some(secs(9)));
        assert_eq!(controller.recorded(), 12);
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            DifficultyConfig::new(Duration::ZERO, 10).validate(),
            Err(DifficultyError::ZeroTargetBlockTime)
        );
        assert_eq!(
            DifficultyConfig::new(secs(1), 0).validate(),
            Err(DifficultyError::ZeroInterval)
        );
        assert_eq!(
            DifficultyConfig::new(secs(1), 1).with_fixed(0.0).validate(),
            Err(DifficultyError::InvalidFixed(0.0))
        );
    }
}
