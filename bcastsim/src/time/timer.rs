use super::SimTime;
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
    fmt,
};

/// Identifies a scheduled event so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Event queue ordered by deadline.
///
/// Events sharing a deadline pop in the order they were pushed.
/// Cancelled events stay in the heap and are skipped when they surface.
pub(crate) struct Timer<T> {
    queue: BinaryHeap<Event<T>>,
    cancelled: HashSet<TimerId>,
    seq: u64,
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Timer {
            queue: BinaryHeap::new(),
            cancelled: HashSet::new(),
            seq: 0,
        }
    }
}

impl<T> Timer<T> {
    pub fn push(&mut self, deadline: SimTime, payload: T) -> TimerId {
        let id = TimerId(self.seq);
        self.seq += 1;
        self.queue.push(Event {
            deadline,
            id,
            payload,
        });
        id
    }

    /// Cancel a pending event. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        if id.0 >= self.seq || !self.queue.iter().any(|e| e.id == id) {
            return false;
        }
        self.cancelled.insert(id)
    }

    /// Pop the earliest live event.
    pub fn pop(&mut self) -> Option<(SimTime, TimerId, T)> {
        self.skip_cancelled();
        let event = self.queue.pop()?;
        Some((event.deadline, event.id, event.payload))
    }

    /// Number of live events.
    pub fn len(&self) -> usize {
        self.queue.len() - self.cancelled.len()
    }

    fn skip_cancelled(&mut self) {
        while let Some(e) = self.queue.peek() {
            if !self.cancelled.remove(&e.id) {
                break;
            }
            self.queue.pop();
        }
    }
}

struct Event<T> {
    deadline: SimTime,
    id: TimerId,
    payload: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl<T> Eq for Event<T> {}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Event<T> {
    // reversed: the heap is a max-heap
    fn cmp(&self, other: &Event<T>) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}
