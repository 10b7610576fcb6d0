//! Per-node tip tracking and the block-receipt rule.

use powsim_types::{BlockHeader, BlockId};
use std::collections::VecDeque;

/// What a node did with a received block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    /// Block became the new tip (first block, or the node was behind).
    Accepted,
    /// Same identity as the held tip. Nothing changes and nothing is re-sent.
    Duplicate,
    /// Older identity than the held tip. The later-timestamped of the two
    /// is kept; `replaced` reports whether that was the received block.
    Stale { replaced: bool },
}

impl ReceiptOutcome {
    /// Whether the node re-broadcasts its resulting tip.
    pub fn rebroadcasts(self) -> bool {
        !matches!(self, ReceiptOutcome::Duplicate)
    }
}

/// A node's view of the chain: its tip plus a bounded record of accepted
/// block identities.
///
/// Stale blocks are resolved by timestamp alone; no cumulative work is
/// compared.
#[derive(Debug, Clone)]
pub struct ChainState {
    tip: Option<BlockHeader>,
    accepted: VecDeque<BlockId>,
    accepted_total: u64,
    history_cap: usize,
}

impl ChainState {
    /// Create an empty chain state keeping at most `history_cap` accepted ids.
    pub fn new(history_cap: usize) -> Self {
        Self {
            tip: None,
            accepted: VecDeque::new(),
            accepted_total: 0,
            history_cap: history_cap.max(1),
        }
    }

    /// The block this node currently regards as its chain head.
    pub fn tip(&self) -> Option<&BlockHeader> {
        self.tip.as_ref()
    }

    /// Whether the tip is exactly `block`.
    pub fn holds(&self, block: &BlockHeader) -> bool {
        self.tip.as_ref() == Some(block)
    }

    /// Most recent accepted block ids, oldest first.
    pub fn accepted(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.accepted.iter().copied()
    }

    /// Blocks accepted over the node's lifetime, including pruned ones.
    pub fn accepted_total(&self) -> u64 {
        self.accepted_total
    }

    /// Apply the receipt rule for `block`.
    pub fn receive(&mut self, block: BlockHeader) -> ReceiptOutcome {
        let Some(tip) = self.tip else {
            self.accept(block);
            return ReceiptOutcome::Accepted;
        };

        if block.id > tip.id {
            self.accept(block);
            ReceiptOutcome::Accepted
        } else if block.id == tip.id {
            ReceiptOutcome::Duplicate
        } else {
            let replaced = block.timestamp > tip.timestamp;
            if replaced {
                self.tip = Some(block);
            }
            ReceiptOutcome::Stale { replaced }
        }
    }

    fn accept(&mut self, block: BlockHeader) {
        self.tip = Some(block);
        self.accepted.push_back(block.id);
        self.accepted_total += 1;
        while self.accepted.len() > self.history_cap {
            self.accepted.pop_front();
        }
    }
}
