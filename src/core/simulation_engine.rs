use super::errors::SimulationError;
use super::event::{Event, Exit, Signal};
use super::event_scheduler::EventScheduler;
use super::process::{Command, Process, ProcessContext, ProcessState, WaitReason, Yield};
use super::resource::{Acquire, Resource};
use super::types::{ProcessId, ResourceId, SimTime};
use log::{debug, trace, warn};
use std::collections::HashMap;

/// Observer trait for simulation events
pub trait SimulationObserver {
    /// Called when the clock jumps forward
    fn on_clock_advance(&mut self, _old_time: SimTime, _new_time: SimTime) {}

    /// Called for every event handed to a process, before it runs
    fn on_event_delivered(&mut self, _event: &Event) {}

    /// Called whenever the number of held slots of a resource changes
    fn on_resource_update(&mut self, _resource: ResourceId, _held: usize, _capacity: usize) {}

    /// Called when a process ends
    fn on_process_finished(&mut self, _process: ProcessId, _exit: Exit, _time: SimTime) {}
}

struct ProcessEntry<C> {
    name: String,
    process: Option<Box<dyn Process<C>>>,
    state: ProcessState,
    /// Sequence number of the one event that will resume this process
    pending: Option<u64>,
    held: Vec<ResourceId>,
    joiners: Vec<ProcessId>,
}

/// Discrete-event engine driving processes over shared run state `C`.
///
/// Single-threaded and cooperative: exactly one process executes at a time and
/// the clock only moves when the next event is delivered.
pub struct Simulation<C> {
    scheduler: EventScheduler,
    resources: Vec<Resource>,
    processes: HashMap<ProcessId, ProcessEntry<C>>,
    /// Exits of finished processes that had no joiner
    exits: HashMap<ProcessId, Exit>,
    next_id: u64,
    state: C,
    observers: Vec<Box<dyn SimulationObserver>>,
    events_delivered: u64,
}

impl<C: 'static> Simulation<C> {
    pub(crate) fn new(
        state: C,
        resources: Vec<Resource>,
        observers: Vec<Box<dyn SimulationObserver>>,
    ) -> Self {
        Self {
            scheduler: EventScheduler::new(),
            resources,
            processes: HashMap::new(),
            exits: HashMap::new(),
            next_id: 0,
            state,
            observers,
            events_delivered: 0,
        }
    }

    /// Add an observer to the simulation
    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    /// Start a process at the current time
    pub fn spawn<P>(&mut self, process: P) -> ProcessId
    where
        P: Process<C> + 'static,
    {
        let id = ProcessId(self.next_id);
        self.next_id += 1;
        self.insert_process(id, Box::new(process));
        id
    }

    /// Interrupt a waiting process.
    ///
    /// Its pending wake-up, queue slot or join is cancelled and it is resumed at
    /// the current time with [`Signal::Interrupted`]. Returns false, and does
    /// nothing, when the target is not waiting.
    pub fn interrupt(&mut self, target: ProcessId) -> bool {
        let Some(entry) = self.processes.get_mut(&target) else {
            warn!("Ignoring interrupt of unknown or ended process {}", target);
            return false;
        };
        let ProcessState::Waiting(reason) = entry.state else {
            warn!("Ignoring interrupt of {} in state {:?}", target, entry.state);
            return false;
        };

        if let Some(sequence_num) = entry.pending.take() {
            self.scheduler.cancel(sequence_num);
        }
        entry.state = ProcessState::Interrupted;
        entry.pending = Some(self.scheduler.schedule_now(target, Signal::Interrupted));

        match reason {
            WaitReason::ResourceGrant(resource) => {
                if let Some(resource) = self.resources.get_mut(resource.0) {
                    resource.cancel_wait(target);
                }
            }
            WaitReason::Join(child) => {
                if let Some(child) = self.processes.get_mut(&child) {
                    child.joiners.retain(|joiner| *joiner != target);
                }
            }
            WaitReason::Timer => {}
        }
        debug!("[t={:.3}] Interrupted {} while waiting on {:?}", self.now(), target, reason);
        true
    }

    /// Deliver events in time order until the queue is empty or the next event
    /// is due after `horizon`. Events due exactly at the horizon are delivered.
    /// The clock ends at `horizon`; unfinished processes are left as they are.
    pub fn run_until(&mut self, horizon: SimTime) -> Result<SimTime, SimulationError> {
        let now = self.now();
        if !horizon.is_finite() || horizon < now {
            return Err(SimulationError::InvalidHorizon { horizon, now });
        }

        while self.step(horizon)? {}

        let old_time = self.now();
        self.scheduler.advance_to(horizon);
        if self.now() > old_time {
            self.notify_clock_advance(old_time, self.now());
        }
        Ok(self.now())
    }

    /// Deliver the next event due at or before `horizon`. Returns false when
    /// there is none.
    pub fn step(&mut self, horizon: SimTime) -> Result<bool, SimulationError> {
        let old_time = self.now();
        let Some(event) = self.scheduler.pop_next(horizon) else {
            return Ok(false);
        };

        if event.due_time > old_time {
            self.notify_clock_advance(old_time, event.due_time);
        }
        for observer in &mut self.observers {
            observer.on_event_delivered(&event);
        }
        self.events_delivered += 1;

        self.dispatch(event)?;
        Ok(true)
    }

    /// Current simulation time
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn state(&self) -> &C {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut C {
        &mut self.state
    }

    pub fn into_state(self) -> C {
        self.state
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.0)
    }

    /// Lifecycle state of a process, `None` if the id was never issued or it
    /// finished and its exit went to a joiner
    pub fn process_state(&self, id: ProcessId) -> Option<ProcessState> {
        if let Some(entry) = self.processes.get(&id) {
            return Some(entry.state);
        }
        self.exits.get(&id).map(|_| ProcessState::Finished)
    }

    /// How a finished process ended. Only kept for processes nobody was
    /// joining when they finished, so later joins can still see it.
    pub fn exit_of(&self, id: ProcessId) -> Option<Exit> {
        self.exits.get(&id).copied()
    }

    /// Number of processes that have not finished
    pub fn active_processes(&self) -> usize {
        self.processes.len()
    }

    pub fn events_delivered(&self) -> u64 {
        self.events_delivered
    }

    /// Check if there are pending events in the scheduler
    pub fn has_pending_events(&self) -> bool {
        self.scheduler.has_events()
    }

    fn insert_process(&mut self, id: ProcessId, process: Box<dyn Process<C>>) {
        let pending = self.scheduler.schedule_now(id, Signal::Start);
        trace!("Spawned {} ({})", id, process.name());
        self.processes.insert(
            id,
            ProcessEntry {
                name: process.name().to_string(),
                process: Some(process),
                state: ProcessState::Runnable,
                pending: Some(pending),
                held: Vec::new(),
                joiners: Vec::new(),
            },
        );
    }

    fn dispatch(&mut self, event: Event) -> Result<(), SimulationError> {
        let id = event.target;
        let Some(entry) = self.processes.get_mut(&id) else {
            trace!("Dropping event {} for ended process {}", event.sequence_num, id);
            return Ok(());
        };
        if entry.pending != Some(event.sequence_num) {
            trace!("Dropping stale event {} for {}", event.sequence_num, id);
            return Ok(());
        }
        entry.pending = None;
        entry.state = ProcessState::Runnable;
        let Some(mut process) = entry.process.take() else {
            return Ok(());
        };
        debug!(
            "[t={:.3}] Resuming {} ({}) with {:?}",
            event.due_time, id, entry.name, event.signal
        );

        let mut ctx = ProcessContext::new(self.scheduler.now(), id, &mut self.state, &mut self.next_id);
        let step = process.resume(event.signal, &mut ctx);
        let commands = std::mem::take(&mut ctx.commands);

        if let Some(entry) = self.processes.get_mut(&id) {
            entry.process = Some(process);
        }
        for command in commands {
            match command {
                Command::Spawn(child, process) => self.insert_process(child, process),
                Command::Interrupt(target) if target != id => {
                    self.interrupt(target);
                }
                Command::Interrupt(_) => {}
                Command::Release(resource) => self.release(id, resource)?,
            }
        }
        self.apply_yield(id, step)
    }

    fn apply_yield(&mut self, id: ProcessId, step: Yield) -> Result<(), SimulationError> {
        match step {
            Yield::Timeout(delay) => {
                let pending = self.scheduler.schedule_after(delay, id, Signal::Timeout);
                self.set_waiting(id, WaitReason::Timer, Some(pending));
            }
            Yield::Acquire(resource_id) => {
                let resource = self
                    .resources
                    .get_mut(resource_id.0)
                    .ok_or(SimulationError::UnknownResource(resource_id))?;
                let pending = match resource.acquire(id) {
                    Acquire::Granted => {
                        if let Some(entry) = self.processes.get_mut(&id) {
                            entry.held.push(resource_id);
                        }
                        Some(self.scheduler.schedule_now(id, Signal::Granted(resource_id)))
                    }
                    Acquire::Queued => None,
                };
                let (held, capacity) = (resource.held(), resource.capacity());
                if pending.is_some() {
                    self.notify_resource_update(resource_id, held, capacity);
                }
                self.set_waiting(id, WaitReason::ResourceGrant(resource_id), pending);
            }
            Yield::Join(child) => {
                if let Some(entry) = self.processes.get_mut(&child) {
                    entry.joiners.push(id);
                    self.set_waiting(id, WaitReason::Join(child), None);
                } else {
                    let exit = *self
                        .exits
                        .get(&child)
                        .ok_or(SimulationError::UnknownProcess(child))?;
                    let pending = self.scheduler.schedule_now(id, Signal::Joined { child, exit });
                    self.set_waiting(id, WaitReason::Join(child), Some(pending));
                }
            }
            Yield::Finish => self.finish(id, Exit::Completed)?,
            Yield::Abort => self.finish(id, Exit::Interrupted)?,
        }
        Ok(())
    }

    fn set_waiting(&mut self, id: ProcessId, reason: WaitReason, pending: Option<u64>) {
        if let Some(entry) = self.processes.get_mut(&id) {
            entry.state = ProcessState::Waiting(reason);
            entry.pending = pending;
        }
    }

    fn release(&mut self, id: ProcessId, resource: ResourceId) -> Result<(), SimulationError> {
        let not_held = SimulationError::NotHeld {
            process: id,
            resource,
        };
        let entry = self.processes.get_mut(&id).ok_or(not_held.clone())?;
        let index = entry
            .held
            .iter()
            .position(|held| *held == resource)
            .ok_or(not_held)?;
        entry.held.remove(index);
        self.release_slot(resource)
    }

    /// Free one slot and hand it to the next live waiter
    fn release_slot(&mut self, resource_id: ResourceId) -> Result<(), SimulationError> {
        let resource = self
            .resources
            .get_mut(resource_id.0)
            .ok_or(SimulationError::UnknownResource(resource_id))?;

        while let Some(next) = resource.release() {
            if let Some(entry) = self.processes.get_mut(&next) {
                entry.held.push(resource_id);
                entry.pending = Some(self.scheduler.schedule_now(next, Signal::Granted(resource_id)));
                break;
            }
        }

        let (held, capacity) = (resource.held(), resource.capacity());
        self.notify_resource_update(resource_id, held, capacity);
        Ok(())
    }

    fn finish(&mut self, id: ProcessId, exit: Exit) -> Result<(), SimulationError> {
        let Some(entry) = self.processes.remove(&id) else {
            return Ok(());
        };
        for resource in entry.held {
            self.release_slot(resource)?;
        }
        // Exits already handed to a joiner are not kept
        if entry.joiners.is_empty() {
            self.exits.insert(id, exit);
        }
        for joiner in entry.joiners {
            if let Some(waiting) = self.processes.get_mut(&joiner) {
                waiting.pending = Some(
                    self.scheduler
                        .schedule_now(joiner, Signal::Joined { child: id, exit }),
                );
            }
        }

        let now = self.now();
        debug!("[t={:.3}] {} ({}) finished: {:?}", now, id, entry.name, exit);
        for observer in &mut self.observers {
            observer.on_process_finished(id, exit, now);
        }
        Ok(())
    }

    fn notify_clock_advance(&mut self, old_time: SimTime, new_time: SimTime) {
        for observer in &mut self.observers {
            observer.on_clock_advance(old_time, new_time);
        }
    }

    fn notify_resource_update(&mut self, resource: ResourceId, held: usize, capacity: usize) {
        for observer in &mut self.observers {
            observer.on_resource_update(resource, held, capacity);
        }
    }
}
