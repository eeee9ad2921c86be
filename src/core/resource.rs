use super::errors::SimulationError;
use super::types::ProcessId;
use std::collections::VecDeque;

/// Bounded-capacity contention point with FIFO admission.
///
/// `held` never exceeds `capacity`. A released slot is handed straight to the
/// head of the waiter queue, so a late arrival can never overtake a waiter.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    capacity: usize,
    held: usize,
    waiters: VecDeque<ProcessId>,
}

/// Result of an acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Granted,
    Queued,
}

impl Resource {
    /// Create a resource with the given capacity
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self, SimulationError> {
        let name = name.into();
        if capacity == 0 {
            return Err(SimulationError::ZeroCapacity(name));
        }
        Ok(Self {
            name,
            capacity,
            held: 0,
            waiters: VecDeque::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held
    pub fn held(&self) -> usize {
        self.held
    }

    /// Number of processes queued for a slot
    pub fn queue_len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_available(&self) -> bool {
        self.held < self.capacity
    }

    /// Take a slot if one is free, otherwise join the back of the queue
    pub fn acquire(&mut self, process: ProcessId) -> Acquire {
        if self.is_available() {
            self.held += 1;
            Acquire::Granted
        } else {
            self.waiters.push_back(process);
            Acquire::Queued
        }
    }

    /// Give back one slot. Returns the waiter that now owns it, if any.
    pub fn release(&mut self) -> Option<ProcessId> {
        debug_assert!(self.held > 0, "release without a held slot");
        self.held = self.held.saturating_sub(1);
        let next = self.waiters.pop_front()?;
        self.held += 1;
        Some(next)
    }

    /// Drop a queued process. Returns false when it was not waiting here.
    pub fn cancel_wait(&mut self, process: ProcessId) -> bool {
        match self.waiters.iter().position(|waiter| *waiter == process) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u64) -> ProcessId {
        ProcessId(n)
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = Resource::new("station", 0);
        assert_eq!(
            result.unwrap_err(),
            SimulationError::ZeroCapacity("station".to_string())
        );
    }

    #[test]
    fn test_grants_until_full_then_queues() {
        let mut resource = Resource::new("supply", 2).unwrap();
        assert_eq!(resource.acquire(pid(1)), Acquire::Granted);
        assert_eq!(resource.acquire(pid(2)), Acquire::Granted);
        assert_eq!(resource.acquire(pid(3)), Acquire::Queued);
        assert_eq!(resource.held(), 2);
        assert_eq!(resource.queue_len(), 1);
        assert!(!resource.is_available());
    }

    #[test]
    fn test_release_hands_slot_to_waiters_in_arrival_order() {
        let mut resource = Resource::new("station", 1).unwrap();
        resource.acquire(pid(1));
        for n in 2..=4 {
            assert_eq!(resource.acquire(pid(n)), Acquire::Queued);
        }

        let mut order = Vec::new();
        while let Some(next) = resource.release() {
            assert_eq!(resource.held(), 1);
            order.push(next.raw());
        }
        assert_eq!(order, vec![2, 3, 4]);
        assert_eq!(resource.held(), 0);
    }

    #[test]
    fn test_cancel_wait_removes_only_that_waiter() {
        let mut resource = Resource::new("station", 1).unwrap();
        resource.acquire(pid(1));
        resource.acquire(pid(2));
        resource.acquire(pid(3));

        assert!(resource.cancel_wait(pid(2)));
        assert!(!resource.cancel_wait(pid(2)));
        assert_eq!(resource.release(), Some(pid(3)));
    }
}
