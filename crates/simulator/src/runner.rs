//! Simulator runner: wires the workload and statistics into one engine run.

use crate::config::SimulatorConfig;
use crate::metrics::{SimulationReport, StatsCollector};
use crate::workload::TransferWorkload;
use crate::SimulatorError;
use powsim_simulation::SimulationRunner;
use tracing::info;

/// Runs one simulation from a [`SimulatorConfig`].
pub struct Simulator {
    config: SimulatorConfig,
    /// Print progress lines to stdout.
    progress: bool,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            progress: false,
        }
    }

    /// Print a progress line every `print_interval` blocks.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Run to completion and collect the report.
    pub fn run(&self) -> Result<SimulationReport, SimulatorError> {
        let config = &self.config;
        let mut runner = SimulationRunner::new(config.to_simulation_config()?)?;

        if config.transactions > 0 {
            let workload = TransferWorkload::new(
                config.transactions,
                config.transaction_interval()?,
                config.wallets,
            )
            .with_config(&config.workload);
            runner = runner.with_transaction_source(Box::new(workload));
        }

        let mut stats = StatsCollector::new(config.print_interval, config.expected_blocks())?
            .with_echo(self.progress);

        info!(
            miners = config.miners,
            nodes = config.nodes,
            transactions = config.transactions,
            expected_blocks = ?config.expected_blocks(),
            "Starting simulator"
        );
        let engine_stats = runner.run_observed(&mut [&mut stats])?;

        let report = stats.report(&engine_stats, runner.race().wins());
        info!(
            blocks = report.blocks,
            transactions = report.transactions,
            stop_reason = ?report.stop_reason,
            "Simulator finished"
        );
        Ok(report)
    }
}
