//! Network configuration and topology construction.

use crate::Node;
use powsim_core::NodeSnapshot;
use powsim_types::NodeIndex;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the simulated peer graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Number of nodes in the network.
    pub num_nodes: usize,

    /// Neighbors each node samples before reciprocity is enforced.
    pub max_neighbors: usize,

    /// Fixed per-hop latency.
    pub latency: Duration,

    /// Bytes per second per node; `None` means unbounded.
    pub bandwidth: Option<u64>,

    /// Bound on each node's accepted-block and broadcast-time history.
    pub history_cap: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_nodes: 2,
            max_neighbors: 1,
            latency: Duration::ZERO,
            bandwidth: None,
            history_cap: 1024,
        }
    }
}

impl NetworkConfig {
    /// Create a config for `num_nodes` nodes with `max_neighbors` each.
    pub fn new(num_nodes: usize, max_neighbors: usize) -> Self {
        Self {
            num_nodes,
            max_neighbors,
            ..Default::default()
        }
    }

    /// Set the per-hop latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the per-node bandwidth in bytes per second.
    pub fn with_bandwidth(mut self, bandwidth: Option<u64>) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Set the per-node history bound.
    pub fn with_history_cap(mut self, history_cap: usize) -> Self {
        self.history_cap = history_cap;
        self
    }

    /// Check parameter combinations before any node is built.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.num_nodes == 0 {
            return Err(TopologyError::NoNodes);
        }
        if self.max_neighbors >= self.num_nodes {
            return Err(TopologyError::TooManyNeighbors {
                neighbors: self.max_neighbors,
                nodes: self.num_nodes,
            });
        }
        if self.bandwidth == Some(0) {
            return Err(TopologyError::ZeroBandwidth);
        }
        Ok(())
    }
}

/// Errors that can occur when building or validating a topology.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// A network needs at least one node.
    #[error("network needs at least one node")]
    NoNodes,

    /// Neighbor count must be below node count.
    #[error("neighbor count {neighbors} must be less than node count {nodes}")]
    TooManyNeighbors { neighbors: usize, nodes: usize },

    /// Finite bandwidth must be positive.
    #[error("bandwidth must be positive when bounded")]
    ZeroBandwidth,

    /// A neighbor list names a node outside the arena.
    #[error("{node} lists unknown neighbor {neighbor}")]
    UnknownNeighbor { node: NodeIndex, neighbor: NodeIndex },

    /// Neighbor lists are not mutual.
    #[error("{node} lists {neighbor} but not the reverse")]
    Asymmetric { node: NodeIndex, neighbor: NodeIndex },
}

/// Arena of nodes forming a symmetric peer graph.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<Node>,
}

impl Network {
    /// Build a random symmetric topology.
    ///
    /// Each node samples `min(max_neighbors, num_nodes - 1)` distinct peers
    /// without replacement; afterwards every edge is made mutual, so nodes
    /// may end up with more neighbors than they sampled.
    pub fn build(config: &NetworkConfig, rng: &mut impl Rng) -> Result<Self, TopologyError> {
        config.validate()?;

        let n = config.num_nodes;
        let mut nodes: Vec<Node> = (0..n)
            .map(|i| {
                Node::new(
                    NodeIndex(i as u32),
                    config.max_neighbors,
                    config.latency,
                    config.bandwidth,
                    config.history_cap,
                )
            })
            .collect();

        let per_node = config.max_neighbors.min(n - 1);
        for node in nodes.iter_mut() {
            let candidates: Vec<NodeIndex> = (0..n)
                .map(|i| NodeIndex(i as u32))
                .filter(|&i| i != node.index())
                .collect();
            for &peer in candidates.choose_multiple(rng, per_node) {
                node.add_neighbor(peer);
            }
        }

        // Reciprocity
        let edges: Vec<(NodeIndex, NodeIndex)> = nodes
            .iter()
            .flat_map(|node| node.neighbors().iter().map(move |&peer| (node.index(), peer)))
            .collect();
        for (from, to) in edges {
            nodes[to.as_usize()].add_neighbor(from);
        }

        let network = Self { nodes };
        info!(
            num_nodes = n,
            max_neighbors = config.max_neighbors,
            edges = network.edge_count(),
            "Built network topology"
        );
        Ok(network)
    }

    /// Wrap hand-built nodes, checking that the graph is symmetric.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, TopologyError> {
        if nodes.is_empty() {
            return Err(TopologyError::NoNodes);
        }
        for node in &nodes {
            for &neighbor in node.neighbors() {
                let Some(peer) = nodes.get(neighbor.as_usize()) else {
                    return Err(TopologyError::UnknownNeighbor {
                        node: node.index(),
                        neighbor,
                    });
                };
                if !peer.has_neighbor(node.index()) {
                    return Err(TopologyError::Asymmetric {
                        node: node.index(),
                        neighbor,
                    });
                }
            }
        }
        debug!(num_nodes = nodes.len(), "Wrapped hand-built topology");
        Ok(Self { nodes })
    }

    /// Connect two nodes in both directions (for hand-built topologies).
    pub fn connect(nodes: &mut [Node], a: NodeIndex, b: NodeIndex) {
        if let Some(node) = nodes.get_mut(a.as_usize()) {
            node.add_neighbor(b);
        }
        if let Some(node) = nodes.get_mut(b.as_usize()) {
            node.add_neighbor(a);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.as_usize())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.neighbors().len()).sum::<usize>() / 2
    }

    /// Whether every neighbor relationship is mutual.
    pub fn is_symmetric(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.neighbors().iter().all(|&peer| {
                self.node(peer)
                    .is_some_and(|p| p.has_neighbor(node.index()))
            })
        })
    }

    /// Per-node counters for observers.
    pub fn snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes.iter().map(Node::snapshot).collect()
    }

    /// Total block sends across all nodes.
    pub fn total_io_requests(&self) -> u64 {
        self.nodes.iter().map(Node::io_requests).sum()
    }

    /// Total bytes broadcast across all nodes.
    pub fn total_bytes_broadcast(&self) -> u64 {
        self.nodes.iter().map(Node::bytes_broadcast).sum()
    }

    /// Close every node's broadcast-time accounting for the current block.
    pub fn close_block_accounting(&mut self) {
        for node in &mut self.nodes {
            node.close_block();
        }
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        self.nodes.get_mut(index.as_usize())
    }
}
