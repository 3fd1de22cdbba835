//! Scheduler driving processes through the event queue.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::config::SimulationConfig;

use super::clock::{DeterministicRng, SimTime};
use super::error::SimulationError;
use super::events::{EventQueue, ScheduledEvent, Wakeup};
use super::invariants::{CapacityInvariant, Invariant, WorkConservingInvariant};
use super::process::{
    Outcome, Process, ProcessHandle, ProcessId, ProcessOutcome, ProcessState, Step,
    WaitCondition,
};
use super::resource::{RequestOutcome, Resource, ResourceId};
use super::state::SimulationMetrics;
use super::trace::{Trace, TraceEntry, TraceKind};

/// Maximum number of invariant violations before stopping simulation.
const MAX_INVARIANT_VIOLATIONS: usize = 10;

/// Process created from inside another process, adopted after the resume returns.
struct PendingSpawn {
    id: ProcessId,
    name: String,
    body: Box<dyn Process>,
}

/// Shared simulation state reachable from process bodies.
///
/// Owns the event queue (and through it the clock), the resources,
/// the random source and the trace.
pub struct Kernel {
    queue: EventQueue,
    resources: Vec<Resource>,
    rng: DeterministicRng,
    trace: Trace,
    next_process_id: u64,
    spawned: Vec<PendingSpawn>,
}

impl Kernel {
    fn new(seed: u64, trace_limit: usize) -> Self {
        Self {
            queue: EventQueue::new(),
            resources: Vec::new(),
            rng: DeterministicRng::from_seed(seed),
            trace: Trace::with_limit(trace_limit),
            next_process_id: 0,
            spawned: Vec::new(),
        }
    }

    /// Returns current simulation time.
    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    /// Returns all resources in creation order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Looks up a resource.
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    /// Returns number of pending events.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    fn resource_mut(&mut self, id: ResourceId) -> Result<&mut Resource, SimulationError> {
        self.resources
            .get_mut(id.index())
            .ok_or(SimulationError::UnknownResource { resource: id })
    }

    fn record(&mut self, process: ProcessId, kind: TraceKind) {
        let now = self.now();
        self.trace.push(now, process, kind);
    }

    /// Allocates an id and schedules the first resumption at the current time.
    fn allocate_process(&mut self, name: &str) -> Result<ProcessId, SimulationError> {
        let id = ProcessId::new(self.next_process_id);
        self.next_process_id += 1;
        self.queue.schedule(self.now(), id, Wakeup::Start)?;
        self.record(
            id,
            TraceKind::Spawned {
                name: name.to_string(),
            },
        );
        debug!(process = %id, name, time = %self.now(), "Spawned process");
        Ok(id)
    }

    fn request(
        &mut self,
        process: ProcessId,
        resource: ResourceId,
    ) -> Result<RequestOutcome, SimulationError> {
        let outcome = self.resource_mut(resource)?.request(process);
        self.record(process, TraceKind::Requested { resource });

        match outcome {
            RequestOutcome::Granted => self.grant(resource, process)?,
            RequestOutcome::Queued { position } => {
                debug!(%process, %resource, position, "Request queued");
                self.record(process, TraceKind::Queued { resource, position });
            }
        }
        Ok(outcome)
    }

    /// Schedules the resumption of a process that has just been handed a slot.
    fn grant(&mut self, resource: ResourceId, process: ProcessId) -> Result<(), SimulationError> {
        debug!(%process, %resource, time = %self.now(), "Slot granted");
        self.record(process, TraceKind::Granted { resource });
        self.queue
            .schedule(self.now(), process, Wakeup::Granted(resource))?;
        Ok(())
    }

    fn release(&mut self, process: ProcessId, resource: ResourceId) -> Result<(), SimulationError> {
        let next = self.resource_mut(resource)?.release(process)?;
        self.record(process, TraceKind::Released { resource });
        if let Some(next) = next {
            self.grant(resource, next)?;
        }
        Ok(())
    }

    /// Returns every slot held by `process` and drops it from every waiting queue.
    fn release_all(&mut self, process: ProcessId) -> Result<(), SimulationError> {
        for index in 0..self.resources.len() {
            let resource = ResourceId::new(index);
            self.resources[index].withdraw(process);
            while self.resources[index].is_holder(process) {
                debug!(%process, %resource, "Releasing slot held at exit");
                self.release(process, resource)?;
            }
        }
        Ok(())
    }
}

/// View of the kernel handed to a process while it runs.
pub struct Context<'a> {
    kernel: &'a mut Kernel,
    process: ProcessId,
}

impl<'a> Context<'a> {
    fn new(kernel: &'a mut Kernel, process: ProcessId) -> Self {
        Self { kernel, process }
    }

    /// Returns current simulation time.
    pub fn now(&self) -> SimTime {
        self.kernel.now()
    }

    /// Returns the id of the running process.
    pub fn process_id(&self) -> ProcessId {
        self.process
    }

    /// Returns the environment's seeded random source.
    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.kernel.rng
    }

    /// Looks up a resource.
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.kernel.resource(id)
    }

    /// Spawns a process whose first resumption happens at the current time,
    /// after every event already scheduled for this instant.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTime` - Propagated from the event queue
    pub fn spawn<P>(
        &mut self,
        name: impl Into<String>,
        process: P,
    ) -> Result<ProcessHandle, SimulationError>
    where
        P: Process + 'static,
    {
        let name = name.into();
        let id = self.kernel.allocate_process(&name)?;
        self.kernel.spawned.push(PendingSpawn {
            id,
            name: name.clone(),
            body: Box::new(process),
        });
        Ok(ProcessHandle::new(id, name))
    }

    /// Returns one slot of `resource` held by the running process.
    ///
    /// # Errors
    ///
    /// - `SimulationError::UnknownResource` - No such resource
    /// - `SimulationError::NotHolder` - The running process holds no slot
    pub fn release(&mut self, resource: ResourceId) -> Result<(), SimulationError> {
        self.kernel.release(self.process, resource)
    }

    /// Appends an annotation to the trace.
    pub fn record(&mut self, label: impl Into<String>, value: i64) {
        let label = label.into();
        self.kernel.record(self.process, TraceKind::Mark { label, value });
    }
}

struct ProcessSlot {
    name: String,
    state: ProcessState,
    body: Option<Box<dyn Process>>,
}

/// Result of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Seed used for reproduction
    pub seed: u64,
    /// Clock value when the run stopped
    pub final_time: SimTime,
    /// One record per spawned process
    pub outcomes: Vec<ProcessOutcome>,
    /// Collected metrics
    pub metrics: SimulationMetrics,
    /// Resource state when the run stopped
    pub resources: Vec<Resource>,
    /// Recorded actions
    pub trace: Vec<TraceEntry>,
    /// Actions that exceeded the trace limit
    pub trace_dropped: u64,
    /// No process failed and no invariant was violated
    pub success: bool,
}

impl SimulationReport {
    /// Returns outcomes of failed processes.
    pub fn failures(&self) -> impl Iterator<Item = &ProcessOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_failed())
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Simulation Report (seed: {})\n", self.seed));
        summary.push_str(&format!("Final time: {}\n", self.final_time));
        summary.push_str(&self.metrics.summary());
        summary.push_str(&format!("Success: {}\n", self.success));
        summary.push_str(&format!(
            "Trace entries: {} kept, {} dropped\n",
            self.trace.len(),
            self.trace_dropped
        ));
        if self.trace_dropped > 0 {
            summary.push_str("WARNING: trace limit reached, the trace is incomplete\n");
        }
        summary.push_str("\nEvent breakdown:\n");

        for (event_type, count) in &self.metrics.events_by_type {
            summary.push_str(&format!("  {event_type}: {count}\n"));
        }

        summary.push_str("\nResources:\n");
        for resource in &self.resources {
            let usage = resource.usage();
            summary.push_str(&format!(
                "  {} (capacity {}): {} grants, peak holders {}, peak queue {}\n",
                resource.name(),
                resource.capacity(),
                usage.grants,
                usage.peak_holders,
                usage.peak_waiting
            ));
        }

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            summary.push_str("\nFailed processes:\n");
            for outcome in failures {
                if let Outcome::Failed { at, reason } = &outcome.outcome {
                    summary.push_str(&format!(
                        "  - {} '{}' at {}: {}\n",
                        outcome.process, outcome.name, at, reason
                    ));
                }
            }
        }

        if !self.metrics.invariant_violations.is_empty() {
            summary.push_str("\nInvariant violations:\n");
            for violation in &self.metrics.invariant_violations {
                summary.push_str(&format!("  - {violation}\n"));
            }
        }

        summary
    }
}

/// Discrete-event simulation environment.
///
/// Owns the kernel and every process continuation, and drives them
/// forward one event at a time.
pub struct Environment {
    config: SimulationConfig,
    kernel: Kernel,
    processes: BTreeMap<ProcessId, ProcessSlot>,
    outcomes: Vec<ProcessOutcome>,
    invariants: Vec<Arc<dyn Invariant>>,
    metrics: SimulationMetrics,
}

impl Environment {
    /// Creates new environment with given configuration.
    ///
    /// # Errors
    /// - `SimulationError::NoDeterministicSeed` - No seed provided in config
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let seed = config
            .deterministic_seed
            .ok_or(SimulationError::NoDeterministicSeed)?;

        let mut invariants: Vec<Arc<dyn Invariant>> = Vec::new();
        if config.check_invariants {
            invariants.push(Arc::new(CapacityInvariant));
            invariants.push(Arc::new(WorkConservingInvariant));
        }

        Ok(Self {
            kernel: Kernel::new(seed, config.trace_limit),
            config,
            processes: BTreeMap::new(),
            outcomes: Vec::new(),
            invariants,
            metrics: SimulationMetrics::new(),
        })
    }

    /// Returns the seed used for this simulation.
    pub fn simulation_seed(&self) -> u64 {
        self.kernel.rng.seed()
    }

    /// Returns current simulation time.
    pub fn now(&self) -> SimTime {
        self.kernel.now()
    }

    /// Gets reference to the kernel state.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Returns the seeded random source for setup code.
    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.kernel.rng
    }

    /// Looks up a resource.
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.kernel.resource(id)
    }

    /// Returns the lifecycle state of a process.
    pub fn process_state(&self, id: ProcessId) -> Option<ProcessState> {
        self.processes.get(&id).map(|slot| slot.state)
    }

    /// Adds an invariant to check during simulation.
    pub fn add_invariant(&mut self, invariant: Arc<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    /// Names of the installed invariants, in checking order.
    pub fn invariant_names(&self) -> Vec<&str> {
        self.invariants
            .iter()
            .map(|invariant| invariant.name())
            .collect()
    }

    /// Creates a resource with fixed capacity.
    ///
    /// # Errors
    /// - `SimulationError::InvalidCapacity` - `capacity` is zero
    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<ResourceId, SimulationError> {
        let id = ResourceId::new(self.kernel.resources.len());
        let resource = Resource::new(id, name, capacity)?;
        debug!(resource = %id, name = resource.name(), capacity, "Added resource");
        self.kernel.resources.push(resource);
        Ok(id)
    }

    /// Spawns a process; its first resumption happens at the current time.
    ///
    /// # Errors
    /// - `SimulationError::InvalidTime` - Propagated from the event queue
    pub fn spawn<P>(
        &mut self,
        name: impl Into<String>,
        process: P,
    ) -> Result<ProcessHandle, SimulationError>
    where
        P: Process + 'static,
    {
        let name = name.into();
        let id = self.kernel.allocate_process(&name)?;
        self.adopt(id, name.clone(), Box::new(process));
        Ok(ProcessHandle::new(id, name))
    }

    /// Runs until the event queue drains, or until the configured horizon.
    ///
    /// Process failures are isolated and reported in the outcomes.
    ///
    /// # Errors
    /// - `SimulationError::InvalidTime` - Configured horizon is invalid or in the past
    /// - `SimulationError::TooManyInvariantViolations` - Too many invariant violations
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        let horizon = self.config.horizon.map(SimTime::new).transpose()?;
        self.execute(horizon)
    }

    /// Runs until the given time; the clock ends exactly at `horizon`.
    ///
    /// # Errors
    /// - `SimulationError::InvalidTime` - `horizon` is before the current time
    /// - `SimulationError::TooManyInvariantViolations` - Too many invariant violations
    pub fn run_until(&mut self, horizon: SimTime) -> Result<SimulationReport, SimulationError> {
        self.execute(Some(horizon))
    }

    fn execute(&mut self, horizon: Option<SimTime>) -> Result<SimulationReport, SimulationError> {
        if let Some(horizon) = horizon
            && horizon < self.now()
        {
            return Err(SimulationError::InvalidTime {
                reason: format!("horizon {horizon} is before current time {}", self.now()),
            });
        }

        info!(
            seed = self.simulation_seed(),
            processes = self.processes.len(),
            pending = self.kernel.pending_events(),
            invariants = ?self.invariant_names(),
            "Starting simulation run"
        );

        while let Some(next) = self.kernel.queue.peek_time() {
            if horizon.is_some_and(|horizon| next > horizon) {
                break;
            }

            self.metrics.update_peak_queue_len(self.kernel.queue.len());
            let Some(event) = self.kernel.queue.pop_next()? else {
                break;
            };
            self.metrics.record_event(event.wakeup.as_str());
            self.dispatch(event);
            self.check_invariants()?;
        }

        if let Some(horizon) = horizon {
            self.kernel.queue.advance_to(horizon)?;
        }

        let report = self.generate_report();
        info!(
            final_time = %report.final_time,
            events = report.metrics.events_processed,
            completed = report.metrics.processes_completed,
            failed = report.metrics.processes_failed,
            "Simulation run finished"
        );
        Ok(report)
    }

    fn adopt(&mut self, id: ProcessId, name: String, body: Box<dyn Process>) {
        self.metrics.record_spawn();
        self.processes.insert(
            id,
            ProcessSlot {
                name,
                state: ProcessState::Created,
                body: Some(body),
            },
        );
    }

    /// Resumes the process bound to `event` and applies the step it yields.
    fn dispatch(&mut self, event: ScheduledEvent) {
        let _span = info_span!("sim", t = %event.time).entered();
        let process = event.process;
        let Some(slot) = self.processes.get_mut(&process) else {
            warn!(%process, "Event for unknown process dropped");
            return;
        };
        let Some(mut body) = slot.body.take() else {
            debug!(%process, state = ?slot.state, "Event for finished process dropped");
            return;
        };

        slot.state = ProcessState::Running;
        debug!(
            %process,
            time = %event.time,
            wakeup = event.wakeup.as_str(),
            "Resuming process"
        );
        self.kernel.record(
            process,
            TraceKind::Resumed {
                wakeup: event.wakeup,
            },
        );

        let result = {
            let mut ctx = Context::new(&mut self.kernel, process);
            body.resume(&mut ctx, event.wakeup)
        };

        let spawned = std::mem::take(&mut self.kernel.spawned);
        for pending in spawned {
            self.adopt(pending.id, pending.name, pending.body);
        }

        let step = match result {
            Ok(step) => step,
            Err(error) => {
                self.fail(process, format!("{error:#}"));
                return;
            }
        };

        let state = match step {
            Step::Done => {
                self.complete(process);
                return;
            }
            Step::Timeout(delay) => {
                self.now().after(delay).and_then(|until| {
                    self.kernel
                        .queue
                        .schedule(until, process, Wakeup::Timeout)
                        .map(|_| WaitCondition::Timeout { until })
                })
            }
            Step::Request(resource) => self
                .kernel
                .request(process, resource)
                .map(|_| WaitCondition::Resource(resource)),
        };

        match state {
            Ok(condition) => {
                if let Some(slot) = self.processes.get_mut(&process) {
                    slot.state = ProcessState::Suspended(condition);
                    slot.body = Some(body);
                }
            }
            Err(error) => self.fail(process, error.to_string()),
        }
    }

    fn complete(&mut self, process: ProcessId) {
        debug!(%process, time = %self.now(), "Process completed");
        self.kernel.record(process, TraceKind::Completed);
        self.metrics.record_completion();
        let outcome = Outcome::Completed { at: self.now() };
        self.finish(process, ProcessState::Completed, outcome);
    }

    fn fail(&mut self, process: ProcessId, reason: String) {
        let name = self
            .processes
            .get(&process)
            .map(|slot| slot.name.clone())
            .unwrap_or_default();
        let failure = SimulationError::ProcessFailure {
            process,
            name,
            reason: reason.clone(),
        };
        warn!(time = %self.now(), "{failure}");

        self.kernel.record(
            process,
            TraceKind::Failed {
                reason: reason.clone(),
            },
        );
        self.metrics.record_failure();
        let outcome = Outcome::Failed {
            at: self.now(),
            reason,
        };
        self.finish(process, ProcessState::Failed, outcome);
    }

    /// Records the terminal outcome and returns everything the process still held.
    fn finish(&mut self, process: ProcessId, state: ProcessState, outcome: Outcome) {
        if let Err(error) = self.kernel.release_all(process) {
            warn!(%process, %error, "Failed to release slots at exit");
        }

        let Some(slot) = self.processes.get_mut(&process) else {
            return;
        };
        slot.state = state;
        slot.body = None;
        self.outcomes.push(ProcessOutcome {
            process,
            name: slot.name.clone(),
            outcome,
        });
    }

    /// Checks all invariants.
    fn check_invariants(&mut self) -> Result<(), SimulationError> {
        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(&self.kernel) {
                warn!(%violation, "Invariant violated");
                self.metrics.record_invariant_violation(violation);

                if self.metrics.invariant_violations.len() >= MAX_INVARIANT_VIOLATIONS {
                    return Err(SimulationError::TooManyInvariantViolations {
                        count: self.metrics.invariant_violations.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Generates simulation report.
    fn generate_report(&self) -> SimulationReport {
        let mut outcomes = self.outcomes.clone();
        outcomes.extend(
            self.processes
                .iter()
                .filter(|(_, slot)| !slot.state.is_terminal())
                .map(|(id, slot)| ProcessOutcome {
                    process: *id,
                    name: slot.name.clone(),
                    outcome: Outcome::Unfinished { state: slot.state },
                }),
        );

        SimulationReport {
            seed: self.simulation_seed(),
            final_time: self.now(),
            outcomes,
            metrics: self.metrics.clone(),
            resources: self.kernel.resources.clone(),
            trace: self.kernel.trace.entries().to_vec(),
            trace_dropped: self.kernel.trace.dropped(),
            success: self.metrics.processes_failed == 0
                && self.metrics.invariant_violations.is_empty(),
        }
    }
}
