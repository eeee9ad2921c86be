use super::event::{Event, Signal};
use super::types::{ProcessId, SimTime};
use log::warn;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

#[derive(Debug)]
struct ScheduledEvent(Event);

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .0
            .due_time
            .total_cmp(&self.0.due_time)
            .then_with(|| other.0.sequence_num.cmp(&self.0.sequence_num))
    }
}

/// Owns the logical clock and the queue of pending wake-ups
#[derive(Debug, Default)]
pub struct EventScheduler {
    event_queue: BinaryHeap<ScheduledEvent>,
    sequence_counter: u64,
    cancelled: HashSet<u64>,
    now: SimTime,
}

impl EventScheduler {
    /// Create a new EventScheduler with the clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule a wake-up of `target` after `delay`, returning its sequence number.
    ///
    /// A negative or NaN delay is clamped to zero.
    pub fn schedule_after(&mut self, delay: SimTime, target: ProcessId, signal: Signal) -> u64 {
        let delay = if delay >= 0.0 {
            delay
        } else {
            warn!("Clamping invalid delay {} for {} to zero", delay, target);
            0.0
        };

        let sequence_num = self.sequence_counter;
        self.sequence_counter += 1;
        self.event_queue.push(ScheduledEvent(Event::new(
            self.now + delay,
            sequence_num,
            target,
            signal,
        )));
        sequence_num
    }

    /// Schedule a wake-up at the current time, behind everything already due now
    pub fn schedule_now(&mut self, target: ProcessId, signal: Signal) -> u64 {
        self.schedule_after(0.0, target, signal)
    }

    /// Cancel a pending event. It is dropped when it reaches the head of the queue.
    pub fn cancel(&mut self, sequence_num: u64) {
        if sequence_num < self.sequence_counter {
            self.cancelled.insert(sequence_num);
        }
    }

    /// Remove and return the earliest live event due at or before `horizon`,
    /// advancing the clock to its due time.
    pub fn pop_next(&mut self, horizon: SimTime) -> Option<Event> {
        loop {
            let due = self.event_queue.peek()?.0.due_time;
            if due > horizon {
                return None;
            }
            let ScheduledEvent(event) = self.event_queue.pop()?;
            if self.cancelled.remove(&event.sequence_num) {
                continue;
            }
            debug_assert!(event.due_time >= self.now, "clock must not run backwards");
            self.now = event.due_time;
            return Some(event);
        }
    }

    /// Move the clock forward without delivering anything
    pub fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Check if there are any events remaining in the queue
    pub fn has_events(&self) -> bool {
        self.pending_count() > 0
    }

    /// Number of live (not cancelled) events in the queue
    pub fn pending_count(&self) -> usize {
        self.event_queue.len().saturating_sub(self.cancelled.len())
    }

    /// Due time of the earliest queued event, cancelled or not
    pub fn peek_next_time(&self) -> Option<SimTime> {
        self.event_queue.peek().map(|event| event.0.due_time)
    }
}
