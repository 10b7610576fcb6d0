//! Sender and receiver selection over the wallet arena.
//!
//! The engine owns balances; the pool only decides who transacts and keeps
//! usage counts so a run can report how skewed its workload was.

use crate::config::WalletSelection;
use powsim_types::{WalletId, WalletSet};
use rand::Rng;

/// Selection state for the transfer workload.
#[derive(Clone, Debug)]
pub struct WalletPool {
    /// Next wallet id to try in round-robin mode.
    round_robin_counter: usize,

    /// Times each wallet was picked as sender.
    usage_counts: Vec<u64>,
}

impl WalletPool {
    /// Create a pool over `wallet_count` wallets.
    pub fn new(wallet_count: usize) -> Self {
        Self {
            round_robin_counter: 0,
            usage_counts: vec![0; wallet_count],
        }
    }

    /// Pick a funded sender, or `None` if no wallet holds coins yet.
    pub fn select_sender<R: Rng + ?Sized>(
        &mut self,
        wallets: &WalletSet,
        selection: WalletSelection,
        rng: &mut R,
    ) -> Option<WalletId> {
        let sender = match selection {
            WalletSelection::Random => {
                let funded: Vec<WalletId> = wallets.funded().collect();
                if funded.is_empty() {
                    return None;
                }
                funded[rng.gen_range(0..funded.len())]
            }
            WalletSelection::RoundRobin => {
                let count = wallets.len();
                let start = self.round_robin_counter;
                let sender = (0..count)
                    .map(|offset| WalletId(((start + offset) % count) as u32))
                    .find(|id| wallets.get(*id).is_ok_and(|w| w.balance() > 0.0))?;
                self.round_robin_counter = sender.as_usize() + 1;
                sender
            }
            WalletSelection::Zipf { exponent } => {
                let funded: Vec<WalletId> = wallets.funded().collect();
                if funded.is_empty() {
                    return None;
                }
                funded[zipf_index(funded.len(), exponent, rng)]
            }
        };
        self.record_usage(sender);
        Some(sender)
    }

    /// Pick a receiver uniformly among the other wallets.
    pub fn select_receiver<R: Rng + ?Sized>(
        &self,
        sender: WalletId,
        wallet_count: usize,
        rng: &mut R,
    ) -> Option<WalletId> {
        if wallet_count < 2 {
            return None;
        }
        let offset = rng.gen_range(1..wallet_count);
        Some(WalletId(((sender.as_usize() + offset) % wallet_count) as u32))
    }

    fn record_usage(&mut self, wallet: WalletId) {
        if let Some(counter) = self.usage_counts.get_mut(wallet.as_usize()) {
            *counter += 1;
        }
    }

    /// Get usage statistics for analysis.
    pub fn usage_stats(&self) -> WalletUsageStats {
        let total_selections: u64 = self.usage_counts.iter().sum();
        let max_selections = self.usage_counts.iter().copied().max().unwrap_or(0);
        let min_selections = self
            .usage_counts
            .iter()
            .copied()
            .filter(|&count| count > 0)
            .min()
            .unwrap_or(0);
        let wallet_count = self.usage_counts.len();
        let avg_selections = if wallet_count > 0 {
            total_selections as f64 / wallet_count as f64
        } else {
            0.0
        };

        WalletUsageStats {
            total_selections,
            avg_selections,
            max_selections,
            min_selections,
            wallet_count,
        }
    }
}

/// Generate a Zipf-distributed index in `0..n`, skewed toward 0.
fn zipf_index<R: Rng + ?Sized>(n: usize, exponent: u32, rng: &mut R) -> usize {
    let exp = exponent.max(1) as f64;
    let u: f64 = rng.gen();
    // Inverse CDF approximation; lands in [1, n], shift to [0, n).
    let rank = (n as f64).powf(1.0 - u).powf(1.0 / exp) as usize;
    rank.saturating_sub(1).min(n - 1)
}

/// Statistics about sender selection.
#[derive(Clone, Debug)]
pub struct WalletUsageStats {
    /// Total number of sender selections.
    pub total_selections: u64,
    /// Average selections per wallet.
    pub avg_selections: f64,
    /// Maximum selections for any wallet.
    pub max_selections: u64,
    /// Minimum selections for any wallet (excluding unused).
    pub min_selections: u64,
    pub wallet_count: usize,
}

impl WalletUsageStats {
    /// Calculate the skew ratio (max / avg). Higher = more uneven.
    pub fn skew_ratio(&self) -> f64 {
        if self.avg_selections > 0.0 {
            self.max_selections as f64 / self.avg_selections
        } else {
            0.0
        }
    }
}
