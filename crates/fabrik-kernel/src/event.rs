//! Scheduled wake-ups, ordered by `(due time, insertion sequence)`.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use fabrik_types::{ClaimId, EventId, ProcId, SimTime};

/// Why a process is being woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// First activation after spawn.
    Start,
    /// A `hold` elapsed.
    Timer,
    /// A claim was granted.
    Grant(ClaimId),
    /// A claim deadline expired before the grant arrived.
    Deadline(ClaimId),
}

/// A scheduled wake-up of a process at a virtual instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub id: EventId,
    pub due: SimTime,
    pub proc: ProcId,
    pub reason: WakeReason,
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Event ids are unique and monotone, so (due, id) is a total order
        // and ties within an instant resolve to insertion order.
        (self.due, self.id).cmp(&(other.due, other.id))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of scheduled wake-ups with lazy cancellation.
///
/// `push` assigns the next insertion sequence as the event id. Cancelled
/// events stay in the heap and are skipped when they surface.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    cancelled: HashSet<EventId>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a wake-up, returning its id.
    pub fn push(&mut self, due: SimTime, proc: ProcId, reason: WakeReason) -> EventId {
        let id = EventId::new(self.next_seq);
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledEvent {
            id,
            due,
            proc,
            reason,
        }));
        id
    }

    /// Mark an event cancelled. It is dropped when it reaches the top.
    pub fn cancel(&mut self, id: EventId) {
        self.cancelled.insert(id);
    }

    /// The sequence number the next pushed event will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// The earliest live event, without removing it.
    pub fn peek(&mut self) -> Option<ScheduledEvent> {
        self.skim();
        self.heap.peek().map(|Reverse(ev)| *ev)
    }

    /// Remove and return the earliest live event.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.skim();
        self.heap.pop().map(|Reverse(ev)| ev)
    }

    /// Drop cancelled events sitting at the top of the heap.
    fn skim(&mut self) {
        while let Some(Reverse(ev)) = self.heap.peek() {
            let id = ev.id;
            if self.cancelled.remove(&id) {
                self.heap.pop();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(events: &[(u64, u32)]) -> EventQueue {
        let mut queue = EventQueue::new();
        for &(due, proc) in events {
            queue.push(SimTime::new(due), ProcId::new(proc), WakeReason::Timer);
        }
        queue
    }

    #[test]
    fn pops_in_time_order() {
        let mut queue = queue_with(&[(30, 0), (10, 1), (20, 2)]);

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|ev| ev.due.as_units())
            .collect();
        assert_eq!(order, vec![10, 20, 30]);
    }

    #[test]
    fn ties_resolve_by_insertion_sequence() {
        let mut queue = queue_with(&[(5, 0), (5, 1), (5, 2)]);

        let order: Vec<u32> = std::iter::from_fn(|| queue.pop())
            .map(|ev| u32::from(ev.proc))
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn cancelled_events_are_skipped_lazily() {
        let mut queue = EventQueue::new();
        let first = queue.push(SimTime::new(1), ProcId::new(0), WakeReason::Timer);
        queue.push(SimTime::new(2), ProcId::new(1), WakeReason::Timer);
        queue.cancel(first);

        let ev = queue.pop().expect("second event survives");
        assert_eq!(u32::from(ev.proc), 1);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn peek_does_not_remove() {
        let mut queue = queue_with(&[(4, 9)]);
        assert_eq!(queue.peek().map(|ev| ev.due.as_units()), Some(4));
        assert_eq!(queue.pop().map(|ev| ev.due.as_units()), Some(4));
        assert!(queue.peek().is_none());
    }
}
