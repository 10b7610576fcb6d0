//! Event ordering for the scheduler queue.

use powsim_core::ProcessId;
use std::time::Duration;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence (submission order, so same-time events run FIFO)
///
/// The sequence is unique per scheduler, so the process never decides order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    /// When the event fires.
    pub time: Duration,
    /// Monotonically increasing submission counter.
    pub sequence: u64,
    /// Process the event resumes.
    pub process: ProcessId,
}

impl EventKey {
    pub fn new(time: Duration, sequence: u64, process: ProcessId) -> Self {
        Self {
            time,
            sequence,
            process,
        }
    }
}
