//! Events delivered by the scheduler.

use powsim_types::{BlockHeader, MinerId, NodeIndex};
use std::fmt;
use std::time::Duration;

/// Identity of a logical process on the virtual timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

/// A resumption point for a suspended process.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Mining loop: draw a new round of mining times.
    MiningRound,

    /// Mining loop: the winning draw has elapsed.
    BlockFound {
        /// Miner with the minimum draw.
        miner: MinerId,
        /// The winning draw (time spent mining this block).
        mining_time: Duration,
    },

    /// Propagation: a block finished its inbound delay at a node.
    BlockArrival {
        /// Receiving node.
        to: NodeIndex,
        /// Block being delivered.
        block: BlockHeader,
    },

    /// Transaction generator: the inter-transaction interval elapsed.
    TransactionTick,
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::MiningRound => "MiningRound",
            Event::BlockFound { .. } => "BlockFound",
            Event::BlockArrival { .. } => "BlockArrival",
            Event::TransactionTick => "TransactionTick",
        }
    }
}
