//! Peer graph and block propagation.
//!
//! Nodes live in an arena ([`Network`]) and name their neighbors by
//! [`NodeIndex`](powsim_types::NodeIndex), so the symmetric (and cyclic)
//! peer graph has no ownership cycles.
//!
//! # Propagation
//!
//! ```text
//! origin accepts block locally
//!     │
//!     ▼
//! broadcast frame (node, block, cursor) ──► neighbor already holds it? skip
//!     │                                          │ no
//!     │                                          ▼
//!     │                              charge hop, BlockArrival after delay
//!     │                                          │
//!     │                                          ▼
//!     │                              ChainState::receive at neighbor
//!     │                                          │ accepted / stale
//!     ◄──────────── push neighbor's frame ◄──────┘
//! ```
//!
//! A send suspends its frame until the receipt (and everything the receipt
//! re-broadcasts) completes. The [`Propagation`] stack holds those
//! suspended frames explicitly.

mod chain;
mod node;
mod propagation;
mod topology;

pub use chain::{ChainState, ReceiptOutcome};
pub use node::Node;
pub use propagation::{Propagation, PropagationStep};
pub use topology::{Network, NetworkConfig, TopologyError};
