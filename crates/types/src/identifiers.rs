//! Domain-specific identifier types.

use std::fmt;

/// Index of a node in the network arena.
///
/// Neighbor lists store these instead of references, so the (cyclic) peer
/// graph never owns itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Position of this node in the arena.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Miner identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinerId(pub u32);

impl fmt::Display for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Miner({})", self.0)
    }
}

/// Index of a wallet in the wallet arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletId(pub u32);

impl WalletId {
    /// Position of this wallet in the arena.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wallet({})", self.0)
    }
}

/// Block identity: the number of blocks finalized before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u64);

impl BlockId {
    /// Identity of the first block.
    pub const GENESIS: Self = BlockId(0);

    /// Get the next block identity.
    pub fn next(self) -> Self {
        BlockId(self.0 + 1)
    }

    /// Get the previous block identity (returns None at genesis).
    pub fn prev(self) -> Option<Self> {
        if self.0 > 0 {
            Some(BlockId(self.0 - 1))
        } else {
            None
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.0)
    }
}
