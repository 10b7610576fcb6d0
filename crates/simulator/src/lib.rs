//! Proof-of-work network simulator
//!
//! Runs the `powsim-simulation` engine from a flat, file-loadable
//! configuration and reports on the result.
//!
//! # Architecture
//!
//! The simulator builds on `powsim-simulation` to provide:
//!
//! - **Wallet Selection**: Random, round-robin or Zipf-skewed senders
//! - **Workload Generation**: A transfer generator plugged in as the engine's
//!   transaction source
//! - **Statistics**: Periodic progress lines and block/propagation time
//!   percentiles
//! - **Configuration**: TOML files with per-field defaults, overridable from
//!   the command line
//!
//! # Example
//!
//! ```ignore
//! use powsim_simulator::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::default()
//!     .with_nodes(20, 4)
//!     .with_blocks(Some(1000))
//!     .with_transactions(5000, 2.0);
//!
//! let report = Simulator::new(config).run()?;
//!
//! println!("Average block time: {:.2}s", report.average_block_time());
//! println!("P99 propagation: {}ms", report.propagation_time.p99);
//! ```

pub mod accounts;
pub mod config;
mod error;
pub mod metrics;
pub mod runner;
pub mod workload;

pub use accounts::{WalletPool, WalletUsageStats};
pub use config::{SimulatorConfig, WalletSelection, WorkloadConfig};
pub use error::SimulatorError;
pub use metrics::{Percentiles, SimulationReport, StatsCollector, StatsLine};
pub use runner::Simulator;
pub use workload::TransferWorkload;
