//! Network participants.

use crate::ChainState;
use powsim_core::NodeSnapshot;
use powsim_types::NodeIndex;
use std::collections::VecDeque;
use std::time::Duration;

/// A peer in the simulated network.
///
/// Identity, bandwidth and latency are fixed at creation. Neighbors are set
/// once by the topology builder.
#[derive(Debug, Clone)]
pub struct Node {
    /// Position in the network arena.
    index: NodeIndex,

    /// Peers this node sends blocks to, in send order.
    neighbors: Vec<NodeIndex>,

    /// Neighbor count requested at topology build (reciprocity may exceed it).
    max_neighbors: usize,

    /// Bytes per second; `None` means unbounded.
    bandwidth: Option<u64>,

    /// Fixed per-hop latency.
    latency: Duration,

    /// Local tip and accepted-block history.
    chain: ChainState,

    /// Block sends issued.
    io_requests: u64,

    /// Bytes sent across all block sends.
    bytes_broadcast: u64,

    /// Hop delay charged while propagating the current block.
    broadcast_time: Duration,

    /// Closed per-block broadcast times, most recent last.
    broadcast_times: VecDeque<Duration>,

    /// Bound on `broadcast_times`.
    history_cap: usize,
}

impl Node {
    /// Create an unconnected node.
    pub fn new(
        index: NodeIndex,
        max_neighbors: usize,
        latency: Duration,
        bandwidth: Option<u64>,
        history_cap: usize,
    ) -> Self {
        Self {
            index,
            neighbors: Vec::new(),
            max_neighbors,
            bandwidth,
            latency,
            chain: ChainState::new(history_cap),
            io_requests: 0,
            bytes_broadcast: 0,
            broadcast_time: Duration::ZERO,
            broadcast_times: VecDeque::new(),
            history_cap: history_cap.max(1),
        }
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn neighbors(&self) -> &[NodeIndex] {
        &self.neighbors
    }

    pub fn max_neighbors(&self) -> usize {
        self.max_neighbors
    }

    pub fn bandwidth(&self) -> Option<u64> {
        self.bandwidth
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn chain(&self) -> &ChainState {
        &self.chain
    }

    pub fn io_requests(&self) -> u64 {
        self.io_requests
    }

    pub fn bytes_broadcast(&self) -> u64 {
        self.bytes_broadcast
    }

    /// Hop delay accumulated for the block currently propagating.
    pub fn current_broadcast_time(&self) -> Duration {
        self.broadcast_time
    }

    /// Closed per-block broadcast times, oldest first.
    pub fn broadcast_times(&self) -> impl DoubleEndedIterator<Item = Duration> + '_ {
        self.broadcast_times.iter().copied()
    }

    /// Time to move `size` bytes across one edge out of (or into) this node.
    pub fn transfer_delay(&self, size: u64) -> Duration {
        let serialization = match self.bandwidth {
            Some(bandwidth) if bandwidth > 0 => {
                Duration::from_secs_f64(size as f64 / bandwidth as f64)
            }
            _ => Duration::ZERO,
        };
        self.latency + serialization
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            node: self.index,
            io_requests: self.io_requests,
            bytes_broadcast: self.bytes_broadcast,
            last_broadcast_time: self.broadcast_times.back().copied().unwrap_or_default(),
        }
    }

    pub(crate) fn chain_mut(&mut self) -> &mut ChainState {
        &mut self.chain
    }

    pub(crate) fn has_neighbor(&self, other: NodeIndex) -> bool {
        self.neighbors.contains(&other)
    }

    pub(crate) fn add_neighbor(&mut self, other: NodeIndex) {
        if other != self.index && !self.has_neighbor(other) {
            self.neighbors.push(other);
        }
    }

    /// Charge one block send of `size` bytes; returns the hop delay charged.
    pub(crate) fn record_send(&mut self, size: u64) -> Duration {
        let hop_delay = self.transfer_delay(size);
        self.io_requests += 1;
        self.bytes_broadcast += size;
        self.broadcast_time += hop_delay;
        hop_delay
    }

    /// Close the current block's broadcast accounting.
    pub(crate) fn close_block(&mut self) {
        self.broadcast_times.push_back(self.broadcast_time);
        self.broadcast_time = Duration::ZERO;
        while self.broadcast_times.len() > self.history_cap {
            self.broadcast_times.pop_front();
        }
    }
}
