//! Deadline-ordered timer queue with cancellable handles.
//!
//! Every delayed action in the application goes through one of these: the
//! owner schedules an action against a monotonic deadline, gets back a
//! [`TimerId`], and later pumps [`Scheduler::pop_due`] from its event loop.
//! Timers fire in non-decreasing deadline order; ties fire in schedule order.
//! Any timer can be cancelled until it has fired, and `cancel_all` retracts
//! everything at once when the audio engine is torn down.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Handle for a scheduled timer, valid until the timer fires or is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Timer queue keyed by monotonic deadline
#[derive(Debug)]
pub struct Scheduler<T> {
    // Keyed by (deadline, id) so same-deadline timers keep schedule order
    queue: BTreeMap<(Instant, u64), T>,
    deadlines: HashMap<u64, Instant>,
    next_id: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
            next_id: 0,
        }
    }

    /// Schedule `action` to fire at `deadline`
    pub fn schedule_at(&mut self, deadline: Instant, action: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.insert((deadline, id), action);
        self.deadlines.insert(id, deadline);
        TimerId(id)
    }

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, timer: TimerId) -> bool {
        match self.deadlines.remove(&timer.0) {
            Some(deadline) => self.queue.remove(&(deadline, timer.0)).is_some(),
            None => false,
        }
    }

    /// Retract every pending timer
    pub fn cancel_all(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }

    /// Take the earliest timer whose deadline is at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, T)> {
        let (&(deadline, _), _) = self.queue.first_key_value()?;
        if deadline > now {
            return None;
        }
        let ((_, id), action) = self.queue.pop_first()?;
        self.deadlines.remove(&id);
        Some((TimerId(id), action))
    }

    /// Earliest pending deadline, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|&(deadline, _)| deadline)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
