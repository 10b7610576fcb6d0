//! Block propagation as an explicit, resumable process.

use crate::{Network, ReceiptOutcome};
use powsim_types::{BlockHeader, NodeIndex};
use std::time::Duration;
use tracing::trace;

/// A node part-way through broadcasting a block to its neighbors.
#[derive(Debug, Clone)]
struct BroadcastFrame {
    /// Node doing the broadcast.
    node: NodeIndex,
    /// Block being broadcast (the node's tip when the frame was opened).
    block: BlockHeader,
    /// Next neighbor to consider.
    cursor: usize,
}

/// What the propagation needs next from the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationStep {
    /// Deliver `block` to `to` once `delay` has elapsed, then call
    /// [`Propagation::deliver`].
    Send {
        from: NodeIndex,
        to: NodeIndex,
        block: BlockHeader,
        delay: Duration,
    },
    /// Every broadcast has finished.
    Complete,
}

/// One block's cascade through the peer graph.
///
/// Each broadcast sends to its neighbors in list order and waits for every
/// receipt (including what that receipt re-broadcasts) before moving to the
/// next neighbor. Waiting frames sit on an explicit stack.
#[derive(Debug, Clone)]
pub struct Propagation {
    origin: NodeIndex,
    block: BlockHeader,
    stack: Vec<BroadcastFrame>,
    sends: u64,
    duplicates: u64,
}

impl Propagation {
    /// Start propagating `block` from `origin`.
    ///
    /// The origin applies the block to its own chain state immediately and
    /// then broadcasts its resulting tip.
    pub fn start(network: &mut Network, origin: NodeIndex, block: BlockHeader) -> Self {
        let mut propagation = Self {
            origin,
            block,
            stack: Vec::new(),
            sends: 0,
            duplicates: 0,
        };
        propagation.apply_receipt(network, origin, block);
        propagation
    }

    pub fn origin(&self) -> NodeIndex {
        self.origin
    }

    /// The block that started this propagation.
    pub fn block(&self) -> &BlockHeader {
        &self.block
    }

    /// Block sends issued so far.
    pub fn sends(&self) -> u64 {
        self.sends
    }

    /// Deliveries that arrived at a node already holding that identity.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Advance the top broadcast until a send is needed or nothing remains.
    ///
    /// Neighbors whose tip already equals the block are skipped without
    /// charging anything. Otherwise the sender's counters are charged the
    /// hop and the receiver's inbound delay is returned.
    pub fn step(&mut self, network: &mut Network) -> PropagationStep {
        while let Some(frame) = self.stack.last_mut() {
            let Some(sender) = network.node(frame.node) else {
                self.stack.pop();
                continue;
            };
            let Some(&to) = sender.neighbors().get(frame.cursor) else {
                self.stack.pop();
                continue;
            };
            frame.cursor += 1;

            let block = frame.block;
            let from = frame.node;
            let Some(receiver) = network.node(to) else {
                continue;
            };
            if receiver.chain().holds(&block) {
                trace!(%from, %to, block = %block.id, "Neighbor already holds block");
                continue;
            }
            let delay = receiver.transfer_delay(block.size);

            if let Some(sender) = network.node_mut(from) {
                let hop_delay = sender.record_send(block.size);
                trace!(%from, %to, block = %block.id, ?hop_delay, "Sending block");
            }
            self.sends += 1;

            return PropagationStep::Send {
                from,
                to,
                block,
                delay,
            };
        }
        PropagationStep::Complete
    }

    /// Apply a delivered block at `to` and open its re-broadcast if the
    /// receipt calls for one.
    pub fn deliver(
        &mut self,
        network: &mut Network,
        to: NodeIndex,
        block: BlockHeader,
    ) -> ReceiptOutcome {
        self.apply_receipt(network, to, block)
    }

    fn apply_receipt(
        &mut self,
        network: &mut Network,
        at: NodeIndex,
        block: BlockHeader,
    ) -> ReceiptOutcome {
        let Some(node) = network.node_mut(at) else {
            return ReceiptOutcome::Duplicate;
        };
        let outcome = node.chain_mut().receive(block);
        trace!(node = %at, block = %block.id, ?outcome, "Block received");

        match outcome {
            ReceiptOutcome::Duplicate => self.duplicates += 1,
            ReceiptOutcome::Accepted | ReceiptOutcome::Stale { .. } => {
                if let Some(tip) = node.chain().tip().copied() {
                    self.stack.push(BroadcastFrame {
                        node: at,
                        block: tip,
                        cursor: 0,
                    });
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;
    use powsim_types::BlockId;

    fn header(id: u64) -> BlockHeader {
        BlockHeader {
            id: BlockId(id),
            timestamp: Duration::from_secs(id * 10),
            since_previous: Duration::from_secs(10),
            transaction_count: 1,
            size: 330,
        }
    }

    fn line(n: u32, latency: Duration) -> Network {
        let mut nodes: Vec<Node> = (0..n)
            .map(|i| Node::new(NodeIndex(i), 2, latency, None, 16))
            .collect();
        for i in 1..n {
            Network::connect(&mut nodes, NodeIndex(i - 1), NodeIndex(i));
        }
        Network::from_nodes(nodes).unwrap()
    }

    /// Drive a propagation to completion, returning the total delay waited.
    fn run(network: &mut Network, origin: NodeIndex, block: BlockHeader) -> (Propagation, Duration) {
        let mut propagation = Propagation::start(network, origin, block);
        let mut elapsed = Duration::ZERO;
        loop {
            match propagation.step(network) {
                PropagationStep::Send {
                    to, block, delay, ..
                } => {
                    elapsed += delay;
                    propagation.deliver(network, to, block);
                }
                PropagationStep::Complete => return (propagation, elapsed),
            }
        }
    }

    #[test]
    fn test_reaches_every_node() {
        let mut network = line(4, Duration::from_secs(1));
        let (propagation, elapsed) = run(&mut network, NodeIndex(0), header(0));

        for node in network.nodes() {
            assert!(node.chain().holds(&header(0)));
        }
        // Three hops down the line; the way back is suppressed by the tip check.
        assert_eq!(propagation.sends(), 3);
        assert_eq!(elapsed, Duration::from_secs(3));
        assert_eq!(network.total_io_requests(), 3);
        assert_eq!(network.total_bytes_broadcast(), 3 * 330);
    }

    #[test]
    fn test_hop_delay_charged_to_sender() {
        let mut network = line(3, Duration::from_secs(2));
        run(&mut network, NodeIndex(1), header(0));

        let middle = network.node(NodeIndex(1)).unwrap();
        assert_eq!(middle.io_requests(), 2);
        assert_eq!(middle.current_broadcast_time(), Duration::from_secs(4));

        network.close_block_accounting();
        let middle = network.node(NodeIndex(1)).unwrap();
        assert_eq!(middle.snapshot().last_broadcast_time, Duration::from_secs(4));
        assert_eq!(middle.current_broadcast_time(), Duration::ZERO);
    }

    #[test]
    fn test_second_delivery_changes_nothing() {
        let mut network = line(3, Duration::ZERO);
        run(&mut network, NodeIndex(0), header(0));
        let before: Vec<_> = network.snapshots();

        // Deliver the same block again directly.
        let mut propagation = Propagation::start(&mut network, NodeIndex(2), header(0));
        assert_eq!(propagation.duplicates(), 1);
        assert_eq!(propagation.step(&mut network), PropagationStep::Complete);
        assert_eq!(network.snapshots(), before);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut nodes: Vec<Node> = (0..4)
            .map(|i| Node::new(NodeIndex(i), 3, Duration::ZERO, None, 16))
            .collect();
        for a in 0..4 {
            for b in (a + 1)..4 {
                Network::connect(&mut nodes, NodeIndex(a), NodeIndex(b));
            }
        }
        let mut network = Network::from_nodes(nodes).unwrap();

        run(&mut network, NodeIndex(0), header(0));
        let (propagation, _) = run(&mut network, NodeIndex(3), header(1));

        for node in network.nodes() {
            assert!(node.chain().holds(&header(1)));
        }
        assert_eq!(propagation.sends(), 3);
    }

    #[test]
    fn test_neighbors_holding_block_are_skipped() {
        let mut network = line(3, Duration::ZERO);
        run(&mut network, NodeIndex(0), header(0));
        Propagation::start(&mut network, NodeIndex(0), header(1));
        Propagation::start(&mut network, NodeIndex(2), header(1));

        // Node 1 hears an old block again: duplicate, nothing moves.
        let (propagation, _) = run(&mut network, NodeIndex(1), header(0));
        assert_eq!(propagation.duplicates(), 1);
        assert_eq!(propagation.sends(), 0);

        // Node 1 catches up; both neighbors already hold the block.
        let io_before = network.total_io_requests();
        let (propagation, _) = run(&mut network, NodeIndex(1), header(1));
        assert_eq!(propagation.sends(), 0);
        assert_eq!(network.total_io_requests(), io_before);
        assert_eq!(
            network.node(NodeIndex(1)).unwrap().chain().tip().map(|t| t.id),
            Some(BlockId(1))
        );
    }
}
