//! Progress lines and the final run report.

use crate::config::SECONDS_PER_YEAR;
use crate::SimulatorError;
use hdrhistogram::Histogram;
use powsim_core::{BlockObserver, ChainSnapshot, NodeSnapshot};
use powsim_simulation::{SimulationStats, StopReason};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::info;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Progress lines kept for inspection after the run by default.
pub const DEFAULT_LINE_HISTORY: usize = 256;

/// One progress line, printed every `print_interval` blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsLine {
    pub blocks: u64,
    /// Blocks the run is expected to produce, if bounded.
    pub expected_blocks: Option<u64>,
    /// Average mining plus propagation time over the recent window, seconds.
    pub average_block_time: f64,
    pub difficulty: f64,
    pub hashrate: u64,
    /// Annualized supply growth since the previous line, in percent.
    pub inflation: f64,
    /// Seconds left at the recent average block time.
    pub eta: Option<f64>,
    pub transactions: u64,
    pub tps: f64,
    pub coin_supply: f64,
    /// Megabytes broadcast by every node so far.
    pub network_mib: f64,
    pub pool_size: usize,
    pub io_requests: u64,
    /// Broadcast time summed over nodes for the recent window, seconds.
    pub network_time: f64,
    /// Fees per block since the previous line.
    pub fees_per_block: Option<f64>,
}

impl fmt::Display for StatsLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected_blocks {
            Some(total) if total > 0 => {
                let percent = self.blocks as f64 / total as f64 * 100.0;
                write!(f, "B:{}/{} {:.2}%", self.blocks, total, percent)?;
            }
            _ => write!(f, "B:{}", self.blocks)?,
        }
        write!(
            f,
            " ABT:{:.2}s Diff:{:.3}M H:{} Infl:{:.2}%",
            self.average_block_time,
            self.difficulty / 1_000_000.0,
            self.hashrate,
            self.inflation
        )?;
        if let Some(eta) = self.eta {
            write!(f, " ETA:{}s", eta.round() as u64)?;
        }
        write!(
            f,
            " Tx:{} TPS:{:.2} C:{:.2}K NMB:{:.2} Pool:{} IO:{}",
            self.transactions,
            self.tps,
            self.coin_supply / 1000.0,
            self.network_mib,
            self.pool_size,
            self.io_requests
        )?;
        if self.network_time > 0.0 {
            write!(f, " Network Time:{:.2}s", self.network_time)?;
        }
        if let Some(fees) = self.fees_per_block {
            write!(f, " AFB:{:.2}", fees)?;
        }
        Ok(())
    }
}

/// Values captured when the previous line was printed.
#[derive(Clone, Copy, Debug, Default)]
struct PrintMark {
    now: Duration,
    blocks: u64,
    transactions: u64,
    coin_supply: f64,
    fees: f64,
}

/// Observer that turns block snapshots into progress lines and histograms.
pub struct StatsCollector {
    print_interval: u64,
    expected_blocks: Option<u64>,
    /// Print lines to stdout as well as logging them.
    echo: bool,

    /// Total times of the last `print_interval` blocks.
    recent_total_times: VecDeque<Duration>,
    /// Broadcast time summed over nodes, per block, for the same window.
    recent_network_times: VecDeque<Duration>,
    mark: PrintMark,

    /// Block times in milliseconds.
    block_times: Histogram<u64>,
    /// Propagation times (total minus mining) in milliseconds.
    propagation_times: Histogram<u64>,

    /// Most recent lines, capped at `line_history`.
    lines: VecDeque<StatsLine>,
    line_history: usize,
    lines_emitted: u64,
    last_chain: Option<ChainSnapshot>,
    last_nodes: Vec<NodeSnapshot>,
}

impl StatsCollector {
    pub fn new(print_interval: u64, expected_blocks: Option<u64>) -> Result<Self, SimulatorError> {
        Ok(Self {
            print_interval: print_interval.max(1),
            expected_blocks,
            echo: false,
            recent_total_times: VecDeque::new(),
            recent_network_times: VecDeque::new(),
            mark: PrintMark::default(),
            block_times: Histogram::new(3)?,
            propagation_times: Histogram::new(3)?,
            lines: VecDeque::new(),
            line_history: DEFAULT_LINE_HISTORY,
            lines_emitted: 0,
            last_chain: None,
            last_nodes: Vec::new(),
        })
    }

    /// Print each line to stdout when it is produced.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Keep at most `line_history` recent lines.
    pub fn with_line_history(mut self, line_history: usize) -> Self {
        self.line_history = line_history;
        self
    }

    /// Most recent lines, oldest first.
    pub fn lines(&self) -> &VecDeque<StatsLine> {
        &self.lines
    }

    /// Lines produced over the whole run, including dropped ones.
    pub fn lines_emitted(&self) -> u64 {
        self.lines_emitted
    }

    pub fn last_chain(&self) -> Option<&ChainSnapshot> {
        self.last_chain.as_ref()
    }

    pub fn block_times(&self) -> &Histogram<u64> {
        &self.block_times
    }

    pub fn propagation_times(&self) -> &Histogram<u64> {
        &self.propagation_times
    }

    /// Build the final report from the collected data and engine counters.
    pub fn report(&self, stats: &SimulationStats, wins: &[u64]) -> SimulationReport {
        let chain = self.last_chain.as_ref();
        SimulationReport {
            stop_reason: stats.stop_reason,
            blocks: chain.map_or(0, |c| c.total_blocks),
            transactions: chain.map_or(0, |c| c.total_transactions),
            coin_supply: chain.map_or(0.0, |c| c.coin_supply),
            total_fees: chain.map_or(0.0, |c| c.total_fees),
            difficulty: chain.map_or(0.0, |c| c.difficulty),
            simulated_time: chain.map_or(Duration::ZERO, |c| c.now),
            events_processed: stats.events_processed,
            block_sends: stats.block_sends,
            duplicate_deliveries: stats.duplicate_deliveries,
            retargets: stats.retargets,
            io_requests: self.last_nodes.iter().map(|n| n.io_requests).sum(),
            bytes_broadcast: self.last_nodes.iter().map(|n| n.bytes_broadcast).sum(),
            block_time: Percentiles::from_histogram(&self.block_times),
            propagation_time: Percentiles::from_histogram(&self.propagation_times),
            wins: wins.to_vec(),
        }
    }

    fn push_window(&mut self, total_time: Duration, network_time: Duration) {
        self.recent_total_times.push_back(total_time);
        self.recent_network_times.push_back(network_time);
        while self.recent_total_times.len() as u64 > self.print_interval {
            self.recent_total_times.pop_front();
        }
        while self.recent_network_times.len() as u64 > self.print_interval {
            self.recent_network_times.pop_front();
        }
    }

    fn build_line(&self, chain: &ChainSnapshot, nodes: &[NodeSnapshot]) -> StatsLine {
        let elapsed = chain.now.saturating_sub(self.mark.now).as_secs_f64();

        // Averaged over the full interval, like the retarget window.
        let average_block_time = self
            .recent_total_times
            .iter()
            .map(Duration::as_secs_f64)
            .sum::<f64>()
            / self.print_interval as f64;

        let tps = if elapsed > 0.0 {
            (chain.total_transactions - self.mark.transactions) as f64 / elapsed
        } else {
            0.0
        };

        let inflation = if elapsed > 0.0 && self.mark.coin_supply > 0.0 {
            let growth = (chain.coin_supply - self.mark.coin_supply) / self.mark.coin_supply;
            growth / elapsed * SECONDS_PER_YEAR * 100.0
        } else {
            0.0
        };

        let eta = self
            .expected_blocks
            .map(|total| average_block_time * total.saturating_sub(chain.total_blocks) as f64);

        let new_fees = chain.total_fees - self.mark.fees;
        let fees_per_block = if new_fees > 0.0 || self.mark.fees > 0.0 {
            let blocks = chain.total_blocks.saturating_sub(self.mark.blocks).max(1);
            Some(new_fees / blocks as f64)
        } else {
            None
        };

        StatsLine {
            blocks: chain.total_blocks,
            expected_blocks: self.expected_blocks,
            average_block_time,
            difficulty: chain.difficulty,
            hashrate: chain.total_hashrate,
            inflation,
            eta,
            transactions: chain.total_transactions,
            tps,
            coin_supply: chain.coin_supply,
            network_mib: nodes.iter().map(|n| n.bytes_broadcast).sum::<u64>() as f64
                / BYTES_PER_MIB,
            pool_size: chain.pool_size,
            io_requests: nodes.iter().map(|n| n.io_requests).sum(),
            network_time: self
                .recent_network_times
                .iter()
                .map(Duration::as_secs_f64)
                .sum(),
            fees_per_block,
        }
    }
}

impl BlockObserver for StatsCollector {
    fn on_block(&mut self, chain: &ChainSnapshot, nodes: &[NodeSnapshot]) {
        let propagation = chain.total_time.saturating_sub(chain.mining_time);
        self.block_times
            .saturating_record(chain.total_time.as_millis() as u64);
        self.propagation_times
            .saturating_record(propagation.as_millis() as u64);

        let network_time = nodes.iter().map(|n| n.last_broadcast_time).sum();
        self.push_window(chain.total_time, network_time);

        if chain.total_blocks % self.print_interval == 0 {
            let line = self.build_line(chain, nodes);
            info!(
                blocks = line.blocks,
                difficulty = line.difficulty,
                abt = line.average_block_time,
                tps = line.tps,
                pool = line.pool_size,
                "Progress"
            );
            if self.echo {
                println!("{line}");
            }
            self.mark = PrintMark {
                now: chain.now,
                blocks: chain.total_blocks,
                transactions: chain.total_transactions,
                coin_supply: chain.coin_supply,
                fees: chain.total_fees,
            };
            self.lines_emitted += 1;
            self.lines.push_back(line);
            while self.lines.len() > self.line_history {
                self.lines.pop_front();
            }
        }

        self.last_chain = Some(chain.clone());
        self.last_nodes.clear();
        self.last_nodes.extend_from_slice(nodes);
    }
}

/// Summary of a latency-style histogram, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Percentiles {
    pub samples: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub max: u64,
}

impl Percentiles {
    fn from_histogram(histogram: &Histogram<u64>) -> Self {
        if histogram.is_empty() {
            return Self::default();
        }
        Self {
            samples: histogram.len(),
            mean: histogram.mean(),
            p50: histogram.value_at_quantile(0.50),
            p90: histogram.value_at_quantile(0.90),
            p99: histogram.value_at_quantile(0.99),
            max: histogram.max(),
        }
    }
}

/// Final results of a run.
#[derive(Clone, Debug)]
pub struct SimulationReport {
    pub stop_reason: Option<StopReason>,
    pub blocks: u64,
    pub transactions: u64,
    pub coin_supply: f64,
    pub total_fees: f64,
    /// Difficulty in force when the run ended.
    pub difficulty: f64,
    pub simulated_time: Duration,
    pub events_processed: u64,
    pub block_sends: u64,
    pub duplicate_deliveries: u64,
    pub retargets: u64,
    pub io_requests: u64,
    pub bytes_broadcast: u64,
    pub block_time: Percentiles,
    pub propagation_time: Percentiles,
    /// Blocks won per miner, indexed by miner id.
    pub wins: Vec<u64>,
}

impl SimulationReport {
    /// Mean block time in seconds.
    pub fn average_block_time(&self) -> f64 {
        self.block_time.mean / 1000.0
    }

    /// Transactions per simulated second.
    pub fn average_tps(&self) -> f64 {
        let secs = self.simulated_time.as_secs_f64();
        if secs > 0.0 {
            self.transactions as f64 / secs
        } else {
            0.0
        }
    }

    pub fn print(&self) {
        println!();
        println!("=== Simulation Report ===");
        match self.stop_reason {
            Some(reason) => println!("Stopped:          {reason:?}"),
            None => println!("Stopped:          (not finished)"),
        }
        println!(
            "Simulated time:   {}",
            humantime::format_duration(Duration::from_secs(self.simulated_time.as_secs()))
        );
        println!("Blocks:           {}", self.blocks);
        println!("Transactions:     {}", self.transactions);
        println!("Average TPS:      {:.4}", self.average_tps());
        println!("Coin supply:      {:.2}", self.coin_supply);
        println!("Fees:             {:.4}", self.total_fees);
        println!("Difficulty:       {:.0}", self.difficulty);
        println!("Retargets:        {}", self.retargets);
        println!();
        println!("Block time (ms):");
        print_percentiles(&self.block_time);
        println!("Propagation time (ms):");
        print_percentiles(&self.propagation_time);
        println!();
        println!("Events processed: {}", self.events_processed);
        println!("Block sends:      {}", self.block_sends);
        println!("Duplicates:       {}", self.duplicate_deliveries);
        println!("I/O requests:     {}", self.io_requests);
        println!(
            "Network usage:    {:.2} MiB",
            self.bytes_broadcast as f64 / BYTES_PER_MIB
        );
        println!();
        println!("Wins per miner:");
        for (miner, wins) in self.wins.iter().enumerate() {
            let share = if self.blocks > 0 {
                *wins as f64 / self.blocks as f64 * 100.0
            } else {
                0.0
            };
            println!("  miner {miner}: {wins} ({share:.1}%)");
        }
    }
}

fn print_percentiles(p: &Percentiles) {
    println!("  samples: {}  mean: {:.1}", p.samples, p.mean);
    println!(
        "  p50: {}  p90: {}  p99: {}  max: {}",
        p.p50, p.p90, p.p99, p.max
    );
}
