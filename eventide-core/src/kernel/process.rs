//! Cooperative process model.
//!
//! A process is a resumable state machine. The environment calls
//! [`Process::resume`] each time the process's wait condition is satisfied;
//! the returned [`Step`] says what the process waits for next.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::clock::{Delay, SimTime};
use super::environment::Context;
use super::error::SimulationError;
use super::events::Wakeup;
use super::resource::ResourceId;

/// Identity of a spawned process, assigned in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(u64);

impl ProcessId {
    /// Creates a process id from its raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Handle returned when a process is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    id: ProcessId,
    name: String,
}

impl ProcessHandle {
    pub(crate) fn new(id: ProcessId, name: String) -> Self {
        Self { id, name }
    }

    /// Returns the process id.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Returns the name given at spawn.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What a process waits for after a resumption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Resume after the delay elapses
    Timeout(Delay),
    /// Resume once a slot of the resource is granted
    Request(ResourceId),
    /// The process is finished
    Done,
}

impl Step {
    /// Builds a timeout step.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidDuration` - `delay` is negative or not finite
    pub fn timeout(delay: f64) -> Result<Step, SimulationError> {
        Ok(Step::Timeout(Delay::new(delay)?))
    }
}

/// Condition a suspended process waits on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WaitCondition {
    /// Sleeping until the given time
    Timeout { until: SimTime },
    /// Waiting for, or holding, a grant of the resource
    Resource(ResourceId),
}

/// Lifecycle state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Spawned, first resumption pending
    Created,
    /// Currently executing
    Running,
    /// Parked at a yield point
    Suspended(WaitCondition),
    /// Body returned `Step::Done`
    Completed,
    /// Body returned an error
    Failed,
}

impl ProcessState {
    /// Completed and Failed are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::Completed | ProcessState::Failed)
    }
}

/// A simulated cooperative task.
pub trait Process {
    /// Runs the process from its last yield point to the next one.
    ///
    /// # Errors
    ///
    /// Any error marks this process as failed; other processes keep running.
    fn resume(&mut self, ctx: &mut Context<'_>, wakeup: Wakeup) -> anyhow::Result<Step>;
}

/// Process backed by a closure. See [`from_fn`].
pub struct FnProcess<F> {
    body: F,
}

impl<F> Process for FnProcess<F>
where
    F: FnMut(&mut Context<'_>, Wakeup) -> anyhow::Result<Step>,
{
    fn resume(&mut self, ctx: &mut Context<'_>, wakeup: Wakeup) -> anyhow::Result<Step> {
        (self.body)(ctx, wakeup)
    }
}

/// Creates a process from a closure that keeps its own state between calls.
pub fn from_fn<F>(body: F) -> FnProcess<F>
where
    F: FnMut(&mut Context<'_>, Wakeup) -> anyhow::Result<Step>,
{
    FnProcess { body }
}

/// Final (or current, for unfinished processes) result of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Finished normally
    Completed { at: SimTime },
    /// Body returned an error
    Failed { at: SimTime, reason: String },
    /// Still parked when the run stopped
    Unfinished { state: ProcessState },
}

/// Outcome record for one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Process id
    pub process: ProcessId,
    /// Name given at spawn
    pub name: String,
    /// What happened to it
    pub outcome: Outcome,
}

impl ProcessOutcome {
    /// Returns true for `Outcome::Completed`.
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, Outcome::Completed { .. })
    }

    /// Returns true for `Outcome::Failed`.
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    /// Converts a failed outcome into the matching error.
    pub fn as_failure(&self) -> Option<SimulationError> {
        match &self.outcome {
            Outcome::Failed { reason, .. } => Some(SimulationError::ProcessFailure {
                process: self.process,
                name: self.name.clone(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}
