//! Core types shared by the simulator's subsystems.
//!
//! - [`Event`]: everything a suspended process can be resumed with
//! - [`ProcessId`]: which logical process an event belongs to
//! - [`ChainSnapshot`] / [`NodeSnapshot`]: the read-only view exposed after
//!   every finalized block
//! - [`BlockObserver`] / [`TransactionSource`]: the seams external
//!   collaborators plug into
//!
//! # Architecture
//!
//! ```text
//! Scheduler pops (time, seq) → Event → process handler → schedule more events
//! ```
//!
//! There is exactly one thread of control. A "process" is a state struct
//! plus the events addressed to it; suspending means scheduling the next
//! event and returning.

mod event;
mod snapshot;
mod traits;

pub use event::{Event, ProcessId};
pub use snapshot::{ChainSnapshot, NodeSnapshot};
pub use traits::{BlockObserver, TransactionSource};
