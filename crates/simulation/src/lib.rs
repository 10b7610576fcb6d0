//! Deterministic simulation runner.
//!
//! Given the same configuration and seed, a run produces identical blocks,
//! balances and counters every time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Scheduler (BTreeMap<EventKey, Event>)          │ │
//! │  │     Ordered by: time, then submission sequence     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │  mining loop ─► ledger ─► propagation ─► retarget  │ │
//! │  │  transaction generator ─► pool                     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     BlockObserver snapshots                        │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod event_queue;
mod runner;
mod scheduler;

pub use config::{ConfigError, SimulationConfig};
pub use error::SimulationError;
pub use event_queue::EventKey;
pub use runner::{SimulationRunner, SimulationStats, StopReason, MIN_BACKLOG};
pub use scheduler::Scheduler;
