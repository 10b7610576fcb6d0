//! Miner construction.

use crate::MiningError;
use powsim_network::Node;
use powsim_types::{MinerId, NodeIndex, WalletId, WalletSet};
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use tracing::debug;

/// A hashing participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miner {
    id: MinerId,
    /// Hashes per second. Zero never wins a round.
    hashrate: u64,
    /// Wallet credited with this miner's rewards.
    wallet: WalletId,
    /// Node the miner announces its blocks through.
    node: NodeIndex,
}

impl Miner {
    pub fn new(id: MinerId, hashrate: u64, wallet: WalletId, node: NodeIndex) -> Self {
        Self {
            id,
            hashrate,
            wallet,
            node,
        }
    }

    pub fn id(&self) -> MinerId {
        self.id
    }

    pub fn hashrate(&self) -> u64 {
        self.hashrate
    }

    pub fn wallet(&self) -> WalletId {
        self.wallet
    }

    pub fn node(&self) -> NodeIndex {
        self.node
    }
}

/// How the network hashrate is divided between miners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashrateDistribution {
    /// Even split; the remainder goes one unit at a time to the first miners.
    Fixed { total: u64 },
    /// Each miner draws uniformly from what is left; the last takes the rest.
    Random { total: u64 },
}

impl HashrateDistribution {
    pub fn total(&self) -> u64 {
        match *self {
            HashrateDistribution::Fixed { total } | HashrateDistribution::Random { total } => {
                total
            }
        }
    }

    fn split(&self, count: usize, rng: &mut impl Rng) -> Vec<u64> {
        match *self {
            HashrateDistribution::Fixed { total } => {
                let share = total / count as u64;
                let remainder = (total % count as u64) as usize;
                (0..count)
                    .map(|i| share + u64::from(i < remainder))
                    .collect()
            }
            HashrateDistribution::Random { total } => {
                let mut remaining = total;
                let mut shares = Vec::with_capacity(count);
                for _ in 1..count {
                    let share = rng.gen_range(0..=remaining);
                    remaining -= share;
                    shares.push(share);
                }
                shares.push(remaining);
                shares
            }
        }
    }
}

/// Build `count` miners, each with a distinct randomly chosen wallet and a
/// randomly chosen node.
pub fn build_miners(
    count: usize,
    distribution: HashrateDistribution,
    wallets: &WalletSet,
    nodes: &[Node],
    rng: &mut impl Rng,
) -> Result<Vec<Miner>, MiningError> {
    if count == 0 {
        return Err(MiningError::NoMiners);
    }
    if nodes.is_empty() {
        return Err(MiningError::NoNodes);
    }
    if count > wallets.len() {
        return Err(MiningError::NotEnoughWallets {
            miners: count,
            wallets: wallets.len(),
        });
    }

    // Iterator sampling keeps source order, so shuffle the pick.
    let mut chosen_wallets: Vec<WalletId> = wallets
        .iter()
        .map(|wallet| wallet.id())
        .choose_multiple(rng, count);
    chosen_wallets.shuffle(rng);

    let shares = distribution.split(count, rng);

    let miners = chosen_wallets
        .into_iter()
        .zip(shares)
        .enumerate()
        .map(|(i, (wallet, hashrate))| {
            let node = nodes
                .choose(rng)
                .map(Node::index)
                .unwrap_or(NodeIndex(0));
            let miner = Miner::new(MinerId(i as u32), hashrate, wallet, node);
            debug!(miner = %miner.id, hashrate, %wallet, %node, "Miner created");
            miner
        })
        .collect();
    Ok(miners)
}

/// Sum of every miner's hashrate.
pub fn total_hashrate(miners: &[Miner]) -> u64 {
    miners.iter().map(Miner::hashrate).sum()
}
