//! The simulation runner: owns every subsystem and drives the processes.

use crate::{ConfigError, Scheduler, SimulationConfig, SimulationError};
use powsim_core::{BlockObserver, ChainSnapshot, Event, ProcessId, TransactionSource};
use powsim_difficulty::DifficultyController;
use powsim_mempool::Ledger;
use powsim_mining::{build_miners, total_hashrate, Miner, MiningRace};
use powsim_network::{Network, Propagation, PropagationStep};
use powsim_types::{BlockHeader, BlockId, MinerId, NodeIndex, WalletSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Pool entries allowed to remain when a transaction-mode run ends. The
/// newest reward always sits in the pool after a block.
pub const MIN_BACKLOG: usize = 1;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BlockLimit,
    TimeLimit,
    /// Transaction source exhausted and the pool drained to `MIN_BACKLOG`.
    TransactionsDrained,
    /// No miner has hashrate.
    NoHashrate,
    /// Nothing left to schedule.
    QueueEmpty,
}

/// Counters collected during a run.
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Events processed by type: mining round, block found, block arrival,
    /// transaction tick.
    pub events_by_type: [u64; 4],
    pub blocks_mined: u64,
    /// Block sends across every propagation.
    pub block_sends: u64,
    /// Deliveries of a block the receiver already held.
    pub duplicate_deliveries: u64,
    pub transactions_submitted: u64,
    pub retargets: u64,
    pub stop_reason: Option<StopReason>,
}

/// A block whose propagation is still running.
struct InFlightBlock {
    process: ProcessId,
    propagation: Propagation,
    mining_time: Duration,
}

/// State of the single mining-loop process.
struct MiningLoop {
    process: ProcessId,
    round_started: Duration,
    /// The loop waits on this before drawing the next round.
    in_flight: Option<InFlightBlock>,
}

/// Deterministic simulation of one proof-of-work network.
pub struct SimulationRunner {
    config: SimulationConfig,
    scheduler: Scheduler,
    rng: ChaCha8Rng,
    network: Network,
    wallets: WalletSet,
    miners: Vec<Miner>,
    race: MiningRace,
    ledger: Ledger,
    difficulty: DifficultyController,
    source: Option<Box<dyn TransactionSource>>,
    mining: MiningLoop,
    generator: Option<ProcessId>,
    started: bool,
    stats: SimulationStats,
}

impl SimulationRunner {
    /// Build topology, wallets and miners from `config`, all drawn from one
    /// RNG seeded with `config.seed`.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let network = Network::build(&config.network, &mut rng)?;
        let wallets = WalletSet::new(config.wallets, config.initial_balance);
        let miners = build_miners(
            config.miners,
            config.hashrate,
            &wallets,
            network.nodes(),
            &mut rng,
        )?;
        Self::from_parts(config, network, wallets, miners, rng)
    }

    /// Assemble a runner around an already built network, wallets and miners.
    pub fn from_parts(
        config: SimulationConfig,
        network: Network,
        wallets: WalletSet,
        miners: Vec<Miner>,
        rng: ChaCha8Rng,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut ledger = Ledger::new(config.ledger.clone())?;
        ledger.record_genesis_allocation(wallets.total_balance());
        let difficulty =
            DifficultyController::new(config.difficulty.clone(), total_hashrate(&miners))?;

        let mut scheduler = Scheduler::new();
        let mining = MiningLoop {
            process: scheduler.spawn(),
            round_started: Duration::ZERO,
            in_flight: None,
        };

        Ok(Self {
            race: MiningRace::new(miners.len()),
            config,
            scheduler,
            rng,
            network,
            wallets,
            miners,
            ledger,
            difficulty,
            source: None,
            mining,
            generator: None,
            started: false,
            stats: SimulationStats::default(),
        })
    }

    /// Attach the transaction generator's source.
    pub fn with_transaction_source(mut self, source: Box<dyn TransactionSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn wallets(&self) -> &WalletSet {
        &self.wallets
    }

    pub fn miners(&self) -> &[Miner] {
        &self.miners
    }

    pub fn race(&self) -> &MiningRace {
        &self.race
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn difficulty(&self) -> &DifficultyController {
        &self.difficulty
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Run to completion without observers.
    pub fn run(&mut self) -> Result<SimulationStats, SimulationError> {
        self.run_observed(&mut [])
    }

    /// Run to completion, handing every observer a snapshot after each
    /// block's propagation completes.
    pub fn run_observed(
        &mut self,
        observers: &mut [&mut dyn BlockObserver],
    ) -> Result<SimulationStats, SimulationError> {
        self.start()?;
        info!(
            seed = self.config.seed,
            nodes = self.network.len(),
            edges = self.network.edge_count(),
            miners = self.miners.len(),
            total_hashrate = total_hashrate(&self.miners),
            difficulty = self.difficulty.difficulty(),
            "Simulation started"
        );

        while !self.ledger.is_stopped() {
            let Some(next) = self.scheduler.peek_time() else {
                self.finish(StopReason::QueueEmpty);
                break;
            };
            if self.config.duration.is_some_and(|end| next > end) {
                self.flush_in_flight(observers);
                self.finish(StopReason::TimeLimit);
                break;
            }
            let Some((process, event)) = self.scheduler.pop_next() else {
                break;
            };

            self.stats.events_processed += 1;
            self.stats.events_by_type[event_slot(&event)] += 1;
            trace!(
                time = ?self.scheduler.now(),
                %process,
                event = event.type_name(),
                "Processing event"
            );
            self.handle(process, event, observers)?;
        }

        info!(
            time = ?self.scheduler.now(),
            blocks = self.ledger.total_blocks(),
            transactions = self.ledger.total_transactions(),
            coin_supply = self.ledger.coin_supply(),
            events = self.stats.events_processed,
            reason = ?self.stats.stop_reason,
            "Simulation finished"
        );
        Ok(self.stats.clone())
    }

    fn start(&mut self) -> Result<(), SimulationError> {
        if self.started {
            return Ok(());
        }
        if self.config.transaction_mode && self.source.is_none() {
            return Err(ConfigError::MissingTransactionSource.into());
        }
        // A zero interval with nothing to send would tick forever at one instant.
        if self
            .source
            .as_ref()
            .is_some_and(|source| source.interval().is_zero())
        {
            return Err(ConfigError::ZeroTransactionInterval.into());
        }
        self.started = true;

        self.scheduler.launch(self.mining.process, Event::MiningRound);
        if self.source.is_some() {
            let generator = self.scheduler.spawn();
            self.generator = Some(generator);
            self.scheduler.launch(generator, Event::TransactionTick);
        }
        Ok(())
    }

    fn finish(&mut self, reason: StopReason) {
        self.stats.stop_reason.get_or_insert(reason);
        self.ledger.stop();
    }

    fn handle(
        &mut self,
        process: ProcessId,
        event: Event,
        observers: &mut [&mut dyn BlockObserver],
    ) -> Result<(), SimulationError> {
        match event {
            Event::MiningRound => self.start_round(),
            Event::BlockFound { miner, mining_time } => {
                self.on_block_found(miner, mining_time, observers)
            }
            Event::BlockArrival { to, block } => {
                self.on_block_arrival(process, to, block, observers)
            }
            Event::TransactionTick => self.on_transaction_tick(process),
        }
    }

    fn start_round(&mut self) -> Result<(), SimulationError> {
        self.mining.round_started = self.scheduler.now();
        let outcome = self
            .race
            .draw(&self.miners, self.difficulty.difficulty(), &mut self.rng)?;

        match outcome {
            Some(outcome) => {
                trace!(miner = %outcome.miner, mining_time = ?outcome.mining_time, "Round drawn");
                self.scheduler.schedule_after(
                    self.mining.process,
                    outcome.mining_time,
                    Event::BlockFound {
                        miner: outcome.miner,
                        mining_time: outcome.mining_time,
                    },
                );
            }
            None => {
                warn!("No miner can win a round, stopping");
                self.finish(StopReason::NoHashrate);
            }
        }
        Ok(())
    }

    fn on_block_found(
        &mut self,
        miner: MinerId,
        mining_time: Duration,
        observers: &mut [&mut dyn BlockObserver],
    ) -> Result<(), SimulationError> {
        let now = self.scheduler.now();
        let (wallet, node) = self
            .miners
            .iter()
            .find(|m| m.id() == miner)
            .map(|m| (m.wallet(), m.node()))
            .ok_or(SimulationError::UnknownMiner(miner))?;

        let header = self.ledger.finalize_current_block(&mut self.wallets, now)?;
        self.ledger.create_next_block(now, Some(wallet))?;
        self.stats.blocks_mined += 1;
        debug!(
            block = %header.id,
            %miner,
            %node,
            ?mining_time,
            transactions = header.transaction_count,
            "Block found"
        );

        let propagation = Propagation::start(&mut self.network, node, header);
        let process = self.scheduler.spawn();
        self.mining.in_flight = Some(InFlightBlock {
            process,
            propagation,
            mining_time,
        });
        self.advance_propagation(observers)
    }

    fn on_block_arrival(
        &mut self,
        process: ProcessId,
        to: NodeIndex,
        block: BlockHeader,
        observers: &mut [&mut dyn BlockObserver],
    ) -> Result<(), SimulationError> {
        let Some(in_flight) = self
            .mining
            .in_flight
            .as_mut()
            .filter(|in_flight| in_flight.process == process)
        else {
            warn!(%process, %to, "Block arrival for a finished propagation");
            return Ok(());
        };
        in_flight.propagation.deliver(&mut self.network, to, block);
        self.advance_propagation(observers)
    }

    /// Step the in-flight propagation: schedule its next arrival or, when
    /// every broadcast is done, close out the block.
    fn advance_propagation(
        &mut self,
        observers: &mut [&mut dyn BlockObserver],
    ) -> Result<(), SimulationError> {
        let Some(in_flight) = self.mining.in_flight.as_mut() else {
            return Ok(());
        };
        let process = in_flight.process;

        match in_flight.propagation.step(&mut self.network) {
            PropagationStep::Send {
                to, block, delay, ..
            } => {
                self.scheduler
                    .schedule_after(process, delay, Event::BlockArrival { to, block });
                Ok(())
            }
            PropagationStep::Complete => match self.mining.in_flight.take() {
                Some(finished) => self.finish_block(finished, observers),
                None => Ok(()),
            },
        }
    }

    fn finish_block(
        &mut self,
        finished: InFlightBlock,
        observers: &mut [&mut dyn BlockObserver],
    ) -> Result<(), SimulationError> {
        let now = self.scheduler.now();
        self.network.close_block_accounting();
        self.stats.block_sends += finished.propagation.sends();
        self.stats.duplicate_deliveries += finished.propagation.duplicates();

        let total_time = now.saturating_sub(self.mining.round_started);
        if self
            .difficulty
            .record(finished.mining_time, total_time)
            .is_some()
        {
            self.stats.retargets += 1;
        }

        self.notify(
            finished.propagation.block().id,
            finished.mining_time,
            total_time,
            observers,
        );

        match self.stop_condition() {
            Some(reason) => {
                debug!(?reason, blocks = self.ledger.total_blocks(), "Stop condition reached");
                self.finish(reason);
            }
            None => {
                self.scheduler.launch(self.mining.process, Event::MiningRound);
            }
        }
        Ok(())
    }

    /// Report a block cut off by the time limit mid-propagation. The ledger
    /// already counts it, so observers see it too; difficulty does not.
    fn flush_in_flight(&mut self, observers: &mut [&mut dyn BlockObserver]) {
        let Some(cut) = self.mining.in_flight.take() else {
            return;
        };
        let now = self.scheduler.now();
        self.network.close_block_accounting();
        self.stats.block_sends += cut.propagation.sends();
        self.stats.duplicate_deliveries += cut.propagation.duplicates();
        debug!(
            block = %cut.propagation.block().id,
            ?now,
            "Propagation cut off by time limit"
        );

        let total_time = now.saturating_sub(self.mining.round_started);
        self.notify(
            cut.propagation.block().id,
            cut.mining_time,
            total_time,
            observers,
        );
    }

    fn notify(
        &self,
        block: BlockId,
        mining_time: Duration,
        total_time: Duration,
        observers: &mut [&mut dyn BlockObserver],
    ) {
        let snapshot = ChainSnapshot {
            now: self.scheduler.now(),
            block,
            difficulty: self.difficulty.difficulty(),
            total_blocks: self.ledger.total_blocks(),
            total_transactions: self.ledger.total_transactions(),
            coin_supply: self.ledger.coin_supply(),
            total_fees: self.ledger.total_fees(),
            pool_size: self.ledger.pool().len(),
            mining_time,
            total_time,
            total_hashrate: total_hashrate(&self.miners),
        };
        let nodes = self.network.snapshots();
        for observer in observers.iter_mut() {
            observer.on_block(&snapshot, &nodes);
        }
    }

    fn on_transaction_tick(&mut self, process: ProcessId) -> Result<(), SimulationError> {
        if self.generator != Some(process) {
            warn!(%process, "Transaction tick for an unknown generator");
            return Ok(());
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(());
        };
        if source.is_exhausted() {
            debug!("Transaction source exhausted");
            return Ok(());
        }

        let now = self.scheduler.now();
        if let Some(tx) = source.next_transaction(&mut self.wallets, now, &mut self.rng)? {
            self.ledger.submit(tx);
            self.stats.transactions_submitted += 1;
        }
        if !source.is_exhausted() {
            let interval = source.interval();
            self.scheduler
                .schedule_after(process, interval, Event::TransactionTick);
        }
        Ok(())
    }

    fn stop_condition(&self) -> Option<StopReason> {
        if self
            .config
            .block_limit
            .is_some_and(|limit| self.ledger.total_blocks() >= limit)
        {
            return Some(StopReason::BlockLimit);
        }
        if self
            .config
            .duration
            .is_some_and(|end| self.scheduler.now() >= end)
        {
            return Some(StopReason::TimeLimit);
        }
        let drained = self.config.transaction_mode
            && self
                .source
                .as_ref()
                .is_some_and(|source| source.is_exhausted())
            && self.ledger.pool().len() <= MIN_BACKLOG;
        drained.then_some(StopReason::TransactionsDrained)
    }
}

fn event_slot(event: &Event) -> usize {
    match event {
        Event::MiningRound => 0,
        Event::BlockFound { .. } => 1,
        Event::BlockArrival { .. } => 2,
        Event::TransactionTick => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powsim_core::NodeSnapshot;
    use powsim_mining::HashrateDistribution;
    use powsim_network::NetworkConfig;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Recorder {
        blocks: Vec<ChainSnapshot>,
        node_counts: Vec<usize>,
    }

    impl BlockObserver for Recorder {
        fn on_block(&mut self, chain: &ChainSnapshot, nodes: &[NodeSnapshot]) {
            self.blocks.push(chain.clone());
            self.node_counts.push(nodes.len());
        }
    }

    fn small_config() -> SimulationConfig {
        SimulationConfig::default()
            .with_network(NetworkConfig::new(4, 2).with_latency(Duration::from_millis(200)))
            .with_miners(3, HashrateDistribution::Fixed { total: 300 })
            .with_block_limit(Some(20))
            .with_duration(None)
    }

    #[test]
    #[traced_test]
    fn test_runs_to_block_limit() {
        let mut runner = SimulationRunner::new(small_config()).unwrap();
        let mut recorder = Recorder::default();
        let stats = runner.run_observed(&mut [&mut recorder]).unwrap();

        assert_eq!(stats.stop_reason, Some(StopReason::BlockLimit));
        assert_eq!(runner.ledger().total_blocks(), 20);
        assert_eq!(stats.blocks_mined, 20);
        assert_eq!(recorder.blocks.len(), 20);
        assert!(recorder.node_counts.iter().all(|&n| n == 4));
        assert!(logs_contain("Simulation finished"));
    }

    #[test]
    fn test_snapshots_are_ordered() {
        let mut runner = SimulationRunner::new(small_config()).unwrap();
        let mut recorder = Recorder::default();
        runner.run_observed(&mut [&mut recorder]).unwrap();

        for (i, pair) in recorder.blocks.windows(2).enumerate() {
            assert!(pair[0].now <= pair[1].now);
            assert_eq!(pair[1].block.0, pair[0].block.0 + 1, "at {i}");
            assert!(pair[1].total_time >= pair[1].mining_time);
        }
    }

    #[test]
    fn test_every_node_ends_on_latest_block() {
        let mut runner = SimulationRunner::new(small_config()).unwrap();
        runner.run().unwrap();

        let latest = runner.ledger().history().last().map(|b| b.header());
        for node in runner.network().nodes() {
            assert_eq!(node.chain().tip().copied(), latest);
        }
    }

    #[test]
    fn test_zero_hashrate_stops_run() {
        let config = small_config().with_miners(2, HashrateDistribution::Fixed { total: 0 });
        let mut runner = SimulationRunner::new(config).unwrap();
        let stats = runner.run().unwrap();

        assert_eq!(stats.stop_reason, Some(StopReason::NoHashrate));
        assert_eq!(runner.ledger().total_blocks(), 0);
        assert!(runner.ledger().is_stopped());
    }

    #[test]
    fn test_time_limit() {
        let config = small_config()
            .with_block_limit(None)
            .with_duration(Some(Duration::from_secs(2_000)));
        let mut runner = SimulationRunner::new(config).unwrap();
        let stats = runner.run().unwrap();

        assert_eq!(stats.stop_reason, Some(StopReason::TimeLimit));
        assert!(runner.now() <= Duration::from_secs(2_000));
        assert!(runner.ledger().total_blocks() > 0);
    }

    #[test]
    fn test_transaction_mode_requires_source() {
        let config = small_config().with_transaction_mode(true);
        let mut runner = SimulationRunner::new(config).unwrap();
        assert_eq!(
            runner.run().unwrap_err(),
            SimulationError::Config(ConfigError::MissingTransactionSource)
        );
    }

    /// Source that never finds a funded sender.
    struct Starved {
        interval: Duration,
    }

    impl TransactionSource for Starved {
        fn next_transaction(
            &mut self,
            _wallets: &mut WalletSet,
            _now: Duration,
            _rng: &mut dyn rand::RngCore,
        ) -> Result<Option<powsim_types::Transaction>, powsim_types::EconomicError> {
            Ok(None)
        }

        fn is_exhausted(&self) -> bool {
            false
        }

        fn interval(&self) -> Duration {
            self.interval
        }
    }

    #[test]
    fn test_zero_interval_source_rejected() {
        let mut runner = SimulationRunner::new(small_config())
            .unwrap()
            .with_transaction_source(Box::new(Starved {
                interval: Duration::ZERO,
            }));
        assert_eq!(
            runner.run().unwrap_err(),
            SimulationError::Config(ConfigError::ZeroTransactionInterval)
        );
        assert_eq!(runner.ledger().total_blocks(), 0);
    }

    #[test]
    fn test_starved_source_does_not_stall_mining() {
        let mut runner = SimulationRunner::new(small_config())
            .unwrap()
            .with_transaction_source(Box::new(Starved {
                interval: Duration::from_secs(1),
            }));
        let stats = runner.run().unwrap();

        assert_eq!(stats.stop_reason, Some(StopReason::BlockLimit));
        assert_eq!(stats.transactions_submitted, 0);
    }

    #[test]
    fn test_time_limit_reports_block_cut_off_mid_propagation() {
        // Hops far slower than the time limit: the first block is still
        // propagating when time runs out.
        let config = small_config()
            .with_network(NetworkConfig::new(4, 2).with_latency(Duration::from_secs(10_000)))
            .with_block_limit(None)
            .with_duration(Some(Duration::from_secs(5_000)));
        let mut runner = SimulationRunner::new(config).unwrap();
        let mut recorder = Recorder::default();
        let stats = runner.run_observed(&mut [&mut recorder]).unwrap();

        assert_eq!(stats.stop_reason, Some(StopReason::TimeLimit));
        assert_eq!(runner.ledger().total_blocks(), 1);
        assert_eq!(recorder.blocks.len(), 1);
        assert_eq!(recorder.blocks[0].total_blocks, 1);
        assert!(recorder.blocks[0].total_time >= recorder.blocks[0].mining_time);
        assert_eq!(stats.block_sends, 1);
        assert_eq!(runner.difficulty().recorded(), 0);
    }
}
