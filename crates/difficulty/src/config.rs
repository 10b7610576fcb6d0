use std::time::Duration;
use thiserror::Error;

/// Retarget parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyConfig {
    /// Block time the controller steers towards.
    pub target_block_time: Duration,

    /// Blocks between retargets, and the size of the averaging window.
    pub interval: usize,

    /// Pin the difficulty to this value and never retarget.
    pub fixed: Option<f64>,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            target_block_time: Duration::from_secs(600),
            interval: 2016,
            fixed: None,
        }
    }
}

impl DifficultyConfig {
    pub fn new(target_block_time: Duration, interval: usize) -> Self {
        Self {
            target_block_time,
            interval,
            fixed: None,
        }
    }

    pub fn with_fixed(mut self, difficulty: f64) -> Self {
        self.fixed = Some(difficulty);
        self
    }

    pub fn validate(&self) -> Result<(), DifficultyError> {
        if self.target_block_time.is_zero() {
            return Err(DifficultyError::ZeroTargetBlockTime);
        }
        if self.interval == 0 {
            return Err(DifficultyError::ZeroInterval);
        }
        if let Some(fixed) = self.fixed {
            if !fixed.is_finite() || fixed <= 0.0 {
                return Err(DifficultyError::InvalidFixed(fixed));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DifficultyError {
    #[error("target block time must be positive")]
    ZeroTargetBlockTime,

    #[error("retarget interval must be at least one block")]
    ZeroInterval,

    #[error("fixed difficulty must be positive and finite, got {0}")]
    InvalidFixed(f64),
}
