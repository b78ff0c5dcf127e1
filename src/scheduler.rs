//! Timer scheduling on a virtual clock
//!
//! Timers are plain deadlines; the owner drains due events with
//! [`Scheduler::pop_due`] from its event loop. Time only moves when the owner
//! passes a later `now`, so tests drive it deterministically.

use std::time::{Duration, Instant};

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<E> {
    id: TimerId,
    deadline: Duration,
    interval: Option<Duration>,
    event: E,
}

/// Single-threaded timer queue yielding events of type `E`
#[derive(Debug)]
pub struct Scheduler<E> {
    now: Duration,
    next_id: u64,
    entries: Vec<Entry<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time (deadline of the event being dispatched, or the last `now`)
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fire `event` once after `delay`
    pub fn schedule_once(&mut self, delay: Duration, event: E) -> TimerId {
        self.insert(delay, None, event)
    }

    /// Fire `event` every `interval`, first after one interval
    pub fn schedule_repeating(&mut self, interval: Duration, event: E) -> TimerId {
        assert!(!interval.is_zero(), "repeating timer needs a non-zero interval");
        self.insert(interval, Some(interval), event)
    }

    /// Cancel a timer. Unknown or already fired ids are ignored.
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Whether `id` will still fire
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Earliest event due at or before `now`.
    ///
    /// Virtual time advances to that event's deadline. Repeating timers are
    /// re-armed from their deadline; overdue ticks collapse into the latest one.
    /// Returns `None` once nothing else is due, leaving time at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, E)> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(_, e)| (e.deadline, e.id.0))
            .map(|(i, _)| i);

        let Some(index) = index else {
            self.now = self.now.max(now);
            return None;
        };

        let entry = &mut self.entries[index];
        let repeat = entry.interval;
        if let Some(interval) = repeat {
            while entry.deadline + interval <= now {
                entry.deadline += interval;
            }
        }
        self.now = self.now.max(entry.deadline);
        let fired = (entry.id, entry.event.clone());

        match repeat {
            Some(interval) => entry.deadline += interval,
            None => {
                self.entries.remove(index);
            }
        }

        Some(fired)
    }

    fn insert(&mut self, delay: Duration, interval: Option<Duration>, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline: self.now + delay,
            interval,
            event,
        });
        id
    }
}

/// Monotonic wall clock feeding the scheduler in the real event loop
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
