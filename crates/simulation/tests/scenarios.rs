//! End-to-end runs of the simulation engine.

use powsim_core::{BlockObserver, ChainSnapshot, NodeSnapshot, TransactionSource};
use powsim_difficulty::DifficultyConfig;
use powsim_mempool::LedgerConfig;
use powsim_mining::HashrateDistribution;
use powsim_network::NetworkConfig;
use powsim_simulation::{SimulationConfig, SimulationRunner, StopReason};
use powsim_types::{EconomicError, Transaction, WalletId, WalletSet};
use rand::RngCore;
use std::time::Duration;
use tracing_test::traced_test;

const EPSILON: f64 = 1e-6;

#[derive(Default)]
struct Recorder {
    chain: Vec<ChainSnapshot>,
    nodes: Vec<Vec<NodeSnapshot>>,
}

impl BlockObserver for Recorder {
    fn on_block(&mut self, chain: &ChainSnapshot, nodes: &[NodeSnapshot]) {
        self.chain.push(chain.clone());
        self.nodes.push(nodes.to_vec());
    }
}

/// Sends a fixed amount from a random funded wallet to a random other wallet.
struct FixedTransfers {
    remaining: u64,
    amount: f64,
    interval: Duration,
}

impl TransactionSource for FixedTransfers {
    fn next_transaction(
        &mut self,
        wallets: &mut WalletSet,
        now: Duration,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Transaction>, EconomicError> {
        let funded: Vec<WalletId> = wallets
            .iter()
            .filter(|w| w.balance() >= self.amount)
            .map(|w| w.id())
            .collect();
        if funded.is_empty() {
            return Ok(None);
        }
        let sender = funded[rng.next_u32() as usize % funded.len()];
        let offset = 1 + rng.next_u32() as usize % (wallets.len() - 1);
        let receiver = WalletId(((sender.as_usize() + offset) % wallets.len()) as u32);

        let tx = Transaction::transfer(wallets.get_mut(sender)?, receiver, self.amount, now)?;
        self.remaining -= 1;
        Ok(Some(tx))
    }

    fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

fn conserved(runner: &SimulationRunner) -> bool {
    let ledger = runner.ledger();
    let held = runner.wallets().total_balance() + ledger.pending_amount() + ledger.unrewarded_fees();
    (held - ledger.coin_supply()).abs() < EPSILON
}

#[test]
#[traced_test]
fn test_zero_hashrate_miner_never_wins() {
    let config = SimulationConfig::default()
        .with_network(NetworkConfig::new(2, 1))
        .with_miners(2, HashrateDistribution::Fixed { total: 1 })
        .with_wallets(2, 0.0)
        .with_ledger(
            LedgerConfig::default()
                .with_block_capacity(1)
                .with_reward(50.0, 0)
                .with_fee_rate(0.0),
        )
        .with_block_limit(Some(1000))
        .with_duration(None);
    let mut runner = SimulationRunner::new(config).unwrap();

    assert_eq!(runner.miners()[0].hashrate(), 1);
    assert_eq!(runner.miners()[1].hashrate(), 0);

    let stats = runner.run().unwrap();
    assert_eq!(stats.stop_reason, Some(StopReason::BlockLimit));
    assert_eq!(runner.ledger().total_blocks(), 1000);
    assert_eq!(runner.race().wins(), &[1000, 0]);
    assert!((runner.ledger().coin_supply() - 50.0 * 1000.0).abs() < EPSILON);

    let loser = runner.miners()[1].wallet();
    assert_eq!(runner.wallets().get(loser).unwrap().balance(), 0.0);
    assert!(conserved(&runner));
}

#[test]
fn test_transaction_mode_drains_pool() {
    let config = SimulationConfig::default()
        .with_network(
            NetworkConfig::new(5, 2)
                .with_latency(Duration::from_millis(50))
                .with_bandwidth(Some(100_000)),
        )
        .with_miners(3, HashrateDistribution::Random { total: 10_000 })
        .with_wallets(10, 100.0)
        .with_ledger(LedgerConfig::default().with_block_capacity(10).with_fee_rate(0.02))
        .with_duration(None)
        .with_transaction_mode(true);
    let source = FixedTransfers {
        remaining: 200,
        amount: 5.0,
        interval: Duration::from_secs(5),
    };
    let mut runner = SimulationRunner::new(config)
        .unwrap()
        .with_transaction_source(Box::new(source));

    let stats = runner.run().unwrap();
    assert_eq!(stats.stop_reason, Some(StopReason::TransactionsDrained));
    assert_eq!(stats.transactions_submitted, 200);
    assert!(runner.ledger().pool().len() <= 1);
    assert!((runner.ledger().total_fees() - 200.0 * 5.0 * 0.02).abs() < EPSILON);
    assert!(conserved(&runner));
}

#[test]
fn test_conservation_holds_after_every_block() {
    struct Checker {
        genesis: f64,
        subsidy: f64,
        blocks: u64,
    }
    impl BlockObserver for Checker {
        fn on_block(&mut self, chain: &ChainSnapshot, _nodes: &[NodeSnapshot]) {
            self.blocks += 1;
            // No halving within the run: supply is genesis plus one subsidy per block.
            let expected = self.genesis + self.subsidy * chain.total_blocks as f64;
            assert!((chain.coin_supply - expected).abs() < EPSILON);
        }
    }

    let config = SimulationConfig::default()
        .with_wallets(10, 20.0)
        .with_ledger(LedgerConfig::default().with_fee_rate(0.1))
        .with_block_limit(Some(50))
        .with_duration(None);
    let source = FixedTransfers {
        remaining: 300,
        amount: 1.0,
        interval: Duration::from_secs(10),
    };
    let mut runner = SimulationRunner::new(config)
        .unwrap()
        .with_transaction_source(Box::new(source));
    let mut checker = Checker {
        genesis: 200.0,
        subsidy: 50.0,
        blocks: 0,
    };

    runner.run_observed(&mut [&mut checker]).unwrap();
    assert_eq!(checker.blocks, 50);
    assert!(conserved(&runner));
}

#[test]
fn test_same_seed_same_run() {
    let config = SimulationConfig::default()
        .with_network(NetworkConfig::new(6, 2).with_latency(Duration::from_millis(300)))
        .with_miners(4, HashrateDistribution::Random { total: 5_000 })
        .with_block_limit(Some(100))
        .with_duration(None)
        .with_seed(7);

    let run = |config: SimulationConfig| {
        let mut runner = SimulationRunner::new(config).unwrap();
        let mut recorder = Recorder::default();
        runner.run_observed(&mut [&mut recorder]).unwrap();
        let balances: Vec<f64> = runner.wallets().iter().map(|w| w.balance()).collect();
        (recorder.chain, recorder.nodes, balances)
    };

    let first = run(config.clone());
    let second = run(config.clone());
    assert_eq!(first, second);

    let other = run(config.with_seed(8));
    assert_ne!(first.0, other.0);
}

#[test]
fn test_retargeting_tracks_target_block_time() {
    let target = Duration::from_secs(60);
    let config = SimulationConfig::default()
        .with_network(NetworkConfig::new(3, 2).with_latency(Duration::from_secs(1)))
        .with_miners(2, HashrateDistribution::Fixed { total: 1_000 })
        .with_difficulty(DifficultyConfig::new(target, 50))
        .with_block_limit(Some(2_000))
        .with_duration(None);
    let mut recorder = Recorder::default();
    let mut runner = SimulationRunner::new(config).unwrap();
    let stats = runner.run_observed(&mut [&mut recorder]).unwrap();

    assert_eq!(stats.retargets, 40);
    // Skip the first window; after that each retarget re-centers on the target.
    let settled = &recorder.chain[50..];
    let average = settled
        .iter()
        .map(|c| c.total_time.as_secs_f64())
        .sum::<f64>()
        / settled.len() as f64;
    assert!(
        (average - target.as_secs_f64()).abs() < 0.15 * target.as_secs_f64(),
        "average block time {average}"
    );
}

#[test]
fn test_fixed_difficulty_does_not_move() {
    let config = SimulationConfig::default()
        .with_difficulty(DifficultyConfig::new(Duration::from_secs(100), 5).with_fixed(12_345.0))
        .with_block_limit(Some(30))
        .with_duration(None);
    let mut recorder = Recorder::default();
    let mut runner = SimulationRunner::new(config).unwrap();
    runner.run_observed(&mut [&mut recorder]).unwrap();

    assert!(recorder.chain.iter().all(|c| c.difficulty == 12_345.0));
    assert_eq!(runner.stats().retargets, 0);
}

#[test]
fn test_propagation_counters_match_sends() {
    let config = SimulationConfig::default()
        .with_network(
            NetworkConfig::new(8, 3)
                .with_latency(Duration::from_millis(100))
                .with_bandwidth(Some(1_000)),
        )
        .with_block_limit(Some(40))
        .with_duration(None);
    let mut recorder = Recorder::default();
    let mut runner = SimulationRunner::new(config).unwrap();
    let stats = runner.run_observed(&mut [&mut recorder]).unwrap();

    let io: u64 = runner.network().total_io_requests();
    assert_eq!(io, stats.block_sends);
    assert!(io >= 40 * 7);

    // Every block pays at least one hop of latency plus serialization.
    for chain in &recorder.chain {
        assert!(chain.total_time > chain.mining_time);
    }
}
