//! Configuration types for the simulator.

use crate::SimulatorError;
use powsim_difficulty::DifficultyConfig;
use powsim_mempool::LedgerConfig;
use powsim_mining::HashrateDistribution;
use powsim_network::NetworkConfig;
use powsim_simulation::SimulationConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Seconds in a simulated year.
pub const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

/// Flat configuration for a simulation run.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// miners = 8
/// nodes = 20
/// neighbors = 4
/// latency_secs = 0.05
/// blocks = 5000
///
/// [workload]
/// selection = { zipf = { exponent = 2 } }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    pub miners: usize,

    pub nodes: usize,

    /// Neighbors each node samples before reciprocity is enforced.
    pub neighbors: usize,

    pub wallets: usize,

    /// Balance every wallet starts with.
    pub initial_balance: f64,

    /// Total network hashrate.
    pub hashrate: u64,

    /// Split hashrate randomly instead of evenly.
    pub random_hashrate: bool,

    /// Target block time in seconds.
    pub block_time_secs: f64,

    /// Blocks between progress lines.
    pub print_interval: u64,

    /// Transfers to generate. Zero disables the generator.
    pub transactions: u64,

    /// Seconds between generated transfers.
    pub transaction_interval_secs: f64,

    /// Transactions per block.
    pub block_size: usize,

    pub reward: f64,

    /// Blocks between reward halvings. Zero never halves.
    pub halving: u64,

    /// Run length in years. Zero or absent means no time limit.
    pub years: Option<f64>,

    /// Stop after this many blocks.
    pub blocks: Option<u64>,

    /// Per-hop latency in seconds.
    pub latency_secs: f64,

    /// Bytes per second per node. Absent means unbounded.
    pub bandwidth: Option<u64>,

    /// Fraction of each transfer taken as fee.
    pub fee: f64,

    /// Pin difficulty and disable retargeting.
    pub difficulty: Option<f64>,

    /// Blocks between difficulty retargets.
    pub retarget_interval: usize,

    /// Finalized blocks kept by the ledger and by each node.
    pub history_cap: usize,

    pub seed: u64,

    pub workload: WorkloadConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            miners: 5,
            nodes: 2,
            neighbors: 1,
            wallets: 10,
            initial_balance: 0.0,
            hashrate: 10_000,
            random_hashrate: false,
            block_time_secs: 100.0,
            print_interval: 144,
            transactions: 0,
            transaction_interval_secs: 10.0,
            block_size: 100,
            reward: 50.0,
            halving: 210_000,
            years: Some(1.0),
            blocks: None,
            latency_secs: 0.0,
            bandwidth: None,
            fee: 0.0,
            difficulty: None,
            retarget_interval: 2016,
            history_cap: 4096,
            seed: 12345,
            workload: WorkloadConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, SimulatorError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulatorError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SimulatorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Set the number of miners.
    pub fn with_miners(mut self, miners: usize) -> Self {
        self.miners = miners;
        self
    }

    /// Set node count and sampled neighbors per node.
    pub fn with_nodes(mut self, nodes: usize, neighbors: usize) -> Self {
        self.nodes = nodes;
        self.neighbors = neighbors;
        self
    }

    /// Stop after `blocks` blocks.
    pub fn with_blocks(mut self, blocks: Option<u64>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Set the run length in years.
    pub fn with_years(mut self, years: Option<f64>) -> Self {
        self.years = years;
        self
    }

    /// Generate `count` transfers, one every `interval_secs`.
    pub fn with_transactions(mut self, count: u64, interval_secs: f64) -> Self {
        self.transactions = count;
        self.transaction_interval_secs = interval_secs;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the workload configuration.
    pub fn with_workload(mut self, workload: WorkloadConfig) -> Self {
        self.workload = workload;
        self
    }

    /// Time limit derived from `years`, if any.
    pub fn duration(&self) -> Result<Option<Duration>, SimulatorError> {
        match self.years {
            Some(years) if years > 0.0 => Ok(Some(secs("years", years * SECONDS_PER_YEAR)?)),
            Some(years) if years < 0.0 => Err(SimulatorError::InvalidValue {
                field: "years",
                value: years,
            }),
            _ => Ok(None),
        }
    }

    /// Blocks the run is expected to produce, for progress reporting.
    ///
    /// The explicit block limit if set, otherwise the number of target block
    /// times that fit into the time limit.
    pub fn expected_blocks(&self) -> Option<u64> {
        if let Some(blocks) = self.blocks {
            return Some(blocks);
        }
        let years = self.years.filter(|y| *y > 0.0)?;
        if self.block_time_secs <= 0.0 {
            return None;
        }
        Some((years * SECONDS_PER_YEAR / self.block_time_secs).ceil() as u64)
    }

    /// Time between generated transfers. Must be positive.
    pub fn transaction_interval(&self) -> Result<Duration, SimulatorError> {
        match secs("transaction_interval_secs", self.transaction_interval_secs)? {
            interval if interval.is_zero() => Err(SimulatorError::InvalidValue {
                field: "transaction_interval_secs",
                value: self.transaction_interval_secs,
            }),
            interval => Ok(interval),
        }
    }

    /// Convert to the engine's configuration.
    pub fn to_simulation_config(&self) -> Result<SimulationConfig, SimulatorError> {
        let network = NetworkConfig::new(self.nodes, self.neighbors)
            .with_latency(secs("latency_secs", self.latency_secs)?)
            .with_bandwidth(self.bandwidth)
            .with_history_cap(self.history_cap);

        let hashrate = if self.random_hashrate {
            HashrateDistribution::Random {
                total: self.hashrate,
            }
        } else {
            HashrateDistribution::Fixed {
                total: self.hashrate,
            }
        };

        let ledger = LedgerConfig::default()
            .with_block_capacity(self.block_size)
            .with_reward(self.reward, self.halving)
            .with_fee_rate(self.fee)
            .with_max_history(self.history_cap);

        if self.block_time_secs <= 0.0 {
            return Err(SimulatorError::InvalidValue {
                field: "block_time_secs",
                value: self.block_time_secs,
            });
        }
        let mut difficulty = DifficultyConfig::new(
            secs("block_time_secs", self.block_time_secs)?,
            self.retarget_interval,
        );
        if let Some(fixed) = self.difficulty {
            difficulty = difficulty.with_fixed(fixed);
        }

        Ok(SimulationConfig::default()
            .with_network(network)
            .with_miners(self.miners, hashrate)
            .with_wallets(self.wallets, self.initial_balance)
            .with_ledger(ledger)
            .with_difficulty(difficulty)
            .with_block_limit(self.blocks)
            .with_duration(self.duration()?)
            .with_transaction_mode(self.transactions > 0)
            .with_seed(self.seed))
    }
}

fn secs(field: &'static str, value: f64) -> Result<Duration, SimulatorError> {
    Duration::try_from_secs_f64(value).map_err(|_| SimulatorError::InvalidValue { field, value })
}

/// How the transfer generator picks senders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletSelection {
    /// Uniform over funded wallets.
    #[default]
    Random,

    /// Cycle through wallet ids, skipping unfunded ones.
    RoundRobin,

    /// Zipf over funded wallets: a few wallets send most transfers.
    Zipf {
        /// Zipf exponent (1 = mild skew, 2+ = heavy skew toward hotspots).
        exponent: u32,
    },
}

/// Transfer workload configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadConfig {
    /// Sender selection.
    pub selection: WalletSelection,

    /// Largest share of the sender's balance a transfer moves, in `(0, 1]`.
    pub max_fraction: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            selection: WalletSelection::default(),
            max_fraction: 0.5,
        }
    }
}

impl WorkloadConfig {
    /// Set the sender selection mode.
    pub fn with_selection(mut self, selection: WalletSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Set the largest fraction of balance moved per transfer.
    pub fn with_max_fraction(mut self, max_fraction: f64) -> Self {
        self.max_fraction = max_fraction.clamp(f64::EPSILON, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = SimulatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulatorConfig::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            miners = 8
            nodes = 20
            neighbors = 4
            bandwidth = 1000000
            blocks = 500
            fee = 0.01

            [workload]
            selection = { zipf = { exponent = 2 } }
            "#,
        )
        .unwrap();

        assert_eq!(config.miners, 8);
        assert_eq!(config.nodes, 20);
        assert_eq!(config.bandwidth, Some(1_000_000));
        assert_eq!(config.blocks, Some(500));
        assert_eq!(config.workload.selection, WalletSelection::Zipf { exponent: 2 });
        assert_eq!(config.workload.max_fraction, 0.5);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(SimulatorConfig::from_toml_str("minerz = 3").is_err());
    }

    #[test]
    fn test_expected_blocks() {
        let config = SimulatorConfig::default();
        assert_eq!(config.expected_blocks(), Some(315_360));

        let config = config.with_blocks(Some(10));
        assert_eq!(config.expected_blocks(), Some(10));

        let config = SimulatorConfig::default().with_years(None);
        assert_eq!(config.expected_blocks(), None);
    }

    #[test]
    fn test_to_simulation_config() {
        let config = SimulatorConfig::default()
            .with_blocks(Some(100))
            .with_years(None)
            .with_transactions(50, 2.5);
        let sim = config.to_simulation_config().unwrap();

        assert_eq!(sim.block_limit, Some(100));
        assert_eq!(sim.duration, None);
        assert!(sim.transaction_mode);
        assert_eq!(sim.hashrate, HashrateDistribution::Fixed { total: 10_000 });
        assert_eq!(sim.difficulty.target_block_time, Duration::from_secs(100));
        assert_eq!(sim.difficulty.interval, 2016);
        assert_eq!(sim.validate(), Ok(()));
    }

    #[test]
    fn test_negative_values_rejected() {
        let config = SimulatorConfig {
            latency_secs: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.to_simulation_config(),
            Err(SimulatorError::InvalidValue {
                field: "latency_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_transaction_interval_rejected() {
        let config = SimulatorConfig::default().with_transactions(10, 0.0);
        assert!(matches!(
            config.transaction_interval(),
            Err(SimulatorError::InvalidValue {
                field: "transaction_interval_secs",
                ..
            })
        ));

        let config = config.with_transactions(10, 0.5);
        assert_eq!(
            config.transaction_interval().unwrap(),
            Duration::from_millis(500)
        );
    }
}
