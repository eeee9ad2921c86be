use super::event::Signal;
use super::types::{ProcessId, ResourceId, SimTime};

/// What a process waits for while suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    Timer,
    ResourceGrant(ResourceId),
    Join(ProcessId),
}

/// Lifecycle state of a process as tracked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Has a start or wake-up event queued, or is executing right now
    Runnable,
    Waiting(WaitReason),
    /// Interrupted, with the interrupt signal queued for delivery
    Interrupted,
    Finished,
}

/// Suspension point returned by [`Process::resume`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Yield {
    /// Sleep for the given duration
    Timeout(SimTime),
    /// Wait for a slot of the resource
    Acquire(ResourceId),
    /// Wait for a child process to end
    Join(ProcessId),
    /// End normally. Held slots are released.
    Finish,
    /// End after an interruption. Held slots are released.
    Abort,
}

/// A cooperatively scheduled unit of sequential logic over shared run state `C`.
///
/// Implementations are explicit state machines: each call runs synchronously from
/// one suspension point to the next, so everything done between two yields is
/// atomic with respect to all other processes.
pub trait Process<C> {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Continue from the last suspension point
    fn resume(&mut self, signal: Signal, ctx: &mut ProcessContext<'_, C>) -> Yield;
}

pub(crate) enum Command<C> {
    Spawn(ProcessId, Box<dyn Process<C>>),
    Interrupt(ProcessId),
    Release(ResourceId),
}

/// Handle a process uses to reach the engine while it is running.
///
/// Spawns, interrupts and releases take effect at the current time, in call
/// order, right after `resume` returns.
pub struct ProcessContext<'a, C> {
    now: SimTime,
    id: ProcessId,
    state: &'a mut C,
    next_id: &'a mut u64,
    pub(crate) commands: Vec<Command<C>>,
}

impl<'a, C> ProcessContext<'a, C> {
    pub(crate) fn new(now: SimTime, id: ProcessId, state: &'a mut C, next_id: &'a mut u64) -> Self {
        Self {
            now,
            id,
            state,
            next_id,
            commands: Vec::new(),
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Id of the running process
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Shared state of the run
    pub fn state(&mut self) -> &mut C {
        self.state
    }

    /// Start a new process at the current time and return its id
    pub fn spawn<P>(&mut self, process: P) -> ProcessId
    where
        P: Process<C> + 'static,
    {
        let id = ProcessId(*self.next_id);
        *self.next_id += 1;
        self.commands.push(Command::Spawn(id, Box::new(process)));
        id
    }

    /// Interrupt another waiting process
    pub fn interrupt(&mut self, target: ProcessId) {
        self.commands.push(Command::Interrupt(target));
    }

    /// Give back a slot held by the running process
    pub fn release(&mut self, resource: ResourceId) {
        self.commands.push(Command::Release(resource));
    }
}
