use super::types::{ProcessId, ResourceId, SimTime};
use serde::{Deserialize, Serialize};

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exit {
    /// The process ran to the end of its logic
    Completed,
    /// The process gave up after being interrupted
    Interrupted,
}

/// What a process is told when it is resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// First resumption after spawning
    Start,
    /// A timeout requested with `Yield::Timeout` elapsed
    Timeout,
    /// A slot of the resource was granted
    Granted(ResourceId),
    /// A joined child process ended
    Joined { child: ProcessId, exit: Exit },
    /// Another process cancelled whatever this one was waiting for
    Interrupted,
}

/// A pending wake-up of one process.
///
/// Ordered by `(due_time, sequence_num)`; the sequence number is assigned on
/// insertion so equal-time events are delivered in insertion order.
#[derive(Debug, Clone)]
pub struct Event {
    pub due_time: SimTime,
    pub sequence_num: u64,
    pub target: ProcessId,
    pub signal: Signal,
}

impl Event {
    pub fn new(due_time: SimTime, sequence_num: u64, target: ProcessId, signal: Signal) -> Self {
        Self {
            due_time,
            sequence_num,
            target,
            signal,
        }
    }
}
