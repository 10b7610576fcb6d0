//! Difficulty controller.
//!
//! Every `interval` blocks the difficulty is rescaled by the ratio of the
//! target block time to the realized average block time (mining plus
//! propagation) over the last `interval` blocks, rounded up:
//!
//! ```text
//! difficulty' = ceil(difficulty * target / (Σ window / interval))
//! ```
//!
//! Blocks arriving slower than target lower the difficulty; faster blocks
//! raise it. No clamping is applied.

mod config;
mod controller;

pub use config::{DifficultyConfig, DifficultyError};
pub use controller::DifficultyController;
