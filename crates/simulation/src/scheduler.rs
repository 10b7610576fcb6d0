//! Virtual clock and event queue.

use crate::EventKey;
use powsim_core::{Event, ProcessId};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::trace;

/// Discrete-event scheduler.
///
/// Processes suspend by scheduling their next event and returning; the
/// scheduler resumes them in (time, submission) order. There is no
/// cancellation.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    sequence: u64,
    next_process: u64,
    queue: BTreeMap<EventKey, Event>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time. Never decreases.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Allocate an identity for a new process.
    pub fn spawn(&mut self) -> ProcessId {
        let id = ProcessId(self.next_process);
        self.next_process += 1;
        id
    }

    /// Start `process` at the current time.
    pub fn launch(&mut self, process: ProcessId, event: Event) -> EventKey {
        self.schedule_after(process, Duration::ZERO, event)
    }

    /// Resume `process` with `event` once `delay` has elapsed.
    pub fn schedule_after(&mut self, process: ProcessId, delay: Duration, event: Event) -> EventKey {
        self.sequence += 1;
        let key = EventKey::new(self.now + delay, self.sequence, process);
        trace!(%process, event = event.type_name(), time = ?key.time, "Event scheduled");
        self.queue.insert(key, event);
        key
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<Duration> {
        self.queue.first_key_value().map(|(key, _)| key.time)
    }

    /// Pop the earliest event and advance the clock to it.
    pub fn pop_next(&mut self) -> Option<(ProcessId, Event)> {
        let (key, event) = self.queue.pop_first()?;
        self.now = key.time;
        Some((key.process, event))
    }

    /// Events still pending.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_time_events_run_fifo() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.spawn();
        let b = scheduler.spawn();

        scheduler.schedule_after(b, Duration::from_secs(5), Event::TransactionTick);
        scheduler.schedule_after(a, Duration::from_secs(5), Event::MiningRound);
        scheduler.launch(b, Event::TransactionTick);

        assert_eq!(scheduler.pop_next(), Some((b, Event::TransactionTick)));
        assert_eq!(scheduler.now(), Duration::ZERO);
        assert_eq!(scheduler.pop_next(), Some((b, Event::TransactionTick)));
        assert_eq!(scheduler.now(), Duration::from_secs(5));
        assert_eq!(scheduler.pop_next(), Some((a, Event::MiningRound)));
        assert_eq!(scheduler.pop_next(), None);
    }

    #[test]
    fn test_delays_are_relative_to_now() {
        let mut scheduler = Scheduler::new();
        let p = scheduler.spawn();
        scheduler.schedule_after(p, Duration::from_secs(3), Event::MiningRound);
        scheduler.pop_next();

        scheduler.schedule_after(p, Duration::from_secs(4), Event::MiningRound);
        assert_eq!(scheduler.peek_time(), Some(Duration::from_secs(7)));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_spawn_allocates_distinct_ids() {
        let mut scheduler = Scheduler::new();
        assert_ne!(scheduler.spawn(), scheduler.spawn());
    }
}
