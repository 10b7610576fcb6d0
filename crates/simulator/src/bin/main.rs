//! Proof-of-work network simulator CLI
//!
//! Runs one simulation and prints progress lines and a final report.

use clap::Parser;
use powsim_simulator::config::SECONDS_PER_YEAR;
use powsim_simulator::{Simulator, SimulatorConfig, WalletSelection};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "powsim")]
#[command(about = "Discrete-event simulator of a proof-of-work blockchain network")]
#[command(version)]
struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of miners
    #[arg(long)]
    miners: Option<usize>,

    /// Number of nodes
    #[arg(long)]
    nodes: Option<usize>,

    /// Neighbors sampled per node (must be below the node count)
    #[arg(long)]
    neighbors: Option<usize>,

    /// Number of wallets
    #[arg(long)]
    wallets: Option<usize>,

    /// Balance every wallet starts with
    #[arg(long)]
    initial_balance: Option<f64>,

    /// Total network hashrate
    #[arg(long)]
    hashrate: Option<u64>,

    /// Split hashrate randomly across miners
    #[arg(long)]
    random_hashrate: bool,

    /// Target block time in seconds
    #[arg(long)]
    blocktime: Option<f64>,

    /// Blocks between progress lines
    #[arg(long = "print")]
    print_interval: Option<u64>,

    /// Transfers to generate (0 disables the generator)
    #[arg(long)]
    transactions: Option<u64>,

    /// Seconds between generated transfers
    #[arg(long)]
    interval: Option<f64>,

    /// Transactions per block
    #[arg(long)]
    blocksize: Option<usize>,

    /// Initial block reward
    #[arg(long)]
    reward: Option<f64>,

    /// Blocks between reward halvings
    #[arg(long)]
    halving: Option<u64>,

    /// Run length in years (0 for no time limit)
    #[arg(long, conflicts_with = "duration")]
    years: Option<f64>,

    /// Run length as a duration (e.g. "30d", "1year")
    #[arg(short, long)]
    duration: Option<humantime::Duration>,

    /// Per-hop latency in seconds
    #[arg(long)]
    latency: Option<f64>,

    /// Node bandwidth in bytes per second (unbounded if absent)
    #[arg(long)]
    bandwidth: Option<u64>,

    /// Fee fraction taken from each transfer (0.0 to 1.0)
    #[arg(long)]
    fee: Option<f64>,

    /// Fix the difficulty and disable retargeting
    #[arg(long)]
    difficulty: Option<f64>,

    /// Blocks between difficulty retargets
    #[arg(long)]
    retarget_interval: Option<usize>,

    /// Stop after this many blocks
    #[arg(long)]
    blocks: Option<u64>,

    /// Sender selection mode (random, round-robin, zipf, zipf:<exponent>)
    #[arg(long)]
    selection: Option<String>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print a progress line after every block
    #[arg(long)]
    debug: bool,
}

fn parse_selection_mode(s: &str) -> Result<WalletSelection, String> {
    match s.to_lowercase().as_str() {
        "random" => Ok(WalletSelection::Random),
        "round-robin" | "roundrobin" => Ok(WalletSelection::RoundRobin),
        "zipf" => Ok(WalletSelection::Zipf { exponent: 1 }),
        s if s.starts_with("zipf:") => {
            let exponent: u32 = s[5..]
                .parse()
                .map_err(|_| format!("Invalid zipf exponent: {}", &s[5..]))?;
            Ok(WalletSelection::Zipf { exponent })
        }
        _ => Err(format!("Unknown selection mode: {}", s)),
    }
}

impl Cli {
    /// Apply command-line overrides on top of `config`.
    fn apply(self, mut config: SimulatorConfig) -> anyhow::Result<SimulatorConfig> {
        if let Some(miners) = self.miners {
            config.miners = miners;
        }
        if let Some(nodes) = self.nodes {
            config.nodes = nodes;
        }
        if let Some(neighbors) = self.neighbors {
            config.neighbors = neighbors;
        }
        if let Some(wallets) = self.wallets {
            config.wallets = wallets;
        }
        if let Some(initial_balance) = self.initial_balance {
            config.initial_balance = initial_balance;
        }
        if let Some(hashrate) = self.hashrate {
            config.hashrate = hashrate;
        }
        if let Some(blocktime) = self.blocktime {
            config.block_time_secs = blocktime;
        }
        if let Some(print_interval) = self.print_interval {
            config.print_interval = print_interval;
        }
        if let Some(transactions) = self.transactions {
            config.transactions = transactions;
        }
        if let Some(interval) = self.interval {
            config.transaction_interval_secs = interval;
        }
        if let Some(blocksize) = self.blocksize {
            config.block_size = blocksize;
        }
        if let Some(reward) = self.reward {
            config.reward = reward;
        }
        if let Some(halving) = self.halving {
            config.halving = halving;
        }
        if let Some(latency) = self.latency {
            config.latency_secs = latency;
        }
        if let Some(fee) = self.fee {
            config.fee = fee;
        }
        if let Some(retarget_interval) = self.retarget_interval {
            config.retarget_interval = retarget_interval;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.random_hashrate {
            config.random_hashrate = true;
        }
        if self.bandwidth.is_some() {
            config.bandwidth = self.bandwidth;
        }
        if self.difficulty.is_some() {
            config.difficulty = self.difficulty;
        }
        if self.blocks.is_some() {
            config.blocks = self.blocks;
        }
        if let Some(years) = self.years {
            config.years = Some(years);
        }
        if let Some(duration) = self.duration {
            config.years = Some(duration.as_secs_f64() / SECONDS_PER_YEAR);
        }
        if let Some(selection) = &self.selection {
            config.workload.selection =
                parse_selection_mode(selection).map_err(anyhow::Error::msg)?;
        }
        if self.debug {
            config.print_interval = 1;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let base = match &cli.config {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };
    let config = cli.apply(base)?;

    println!(
        "Simulating {} miners on {} nodes ({} neighbors), hashrate {}, target block time {}s, seed {}",
        config.miners,
        config.nodes,
        config.neighbors,
        config.hashrate,
        config.block_time_secs,
        config.seed
    );

    let report = Simulator::new(config).with_progress(true).run()?;
    report.print();

    Ok(())
}
