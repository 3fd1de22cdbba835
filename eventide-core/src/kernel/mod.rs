//! Discrete-event simulation kernel.
//!
//! Processes are resumable state machines driven by an [`Environment`].
//! Time only advances when the next event is dispatched, and events at the
//! same instant run in the order they were scheduled, so a run is fully
//! determined by its seed.

mod clock;
mod environment;
mod error;
mod events;
mod invariants;
mod process;
mod resource;
mod state;
mod trace;

// Re-export core types for public API
pub use clock::{Delay, DeterministicRng, SimClock, SimTime};
pub use environment::{Context, Environment, Kernel, SimulationReport};
pub use error::SimulationError;
pub use events::{EventId, EventQueue, ScheduledEvent, Wakeup};
pub use invariants::{CapacityInvariant, Invariant, InvariantViolation, WorkConservingInvariant};
pub use process::{
    FnProcess, Outcome, Process, ProcessHandle, ProcessId, ProcessOutcome, ProcessState, Step,
    WaitCondition, from_fn,
};
pub use resource::{RequestOutcome, Resource, ResourceId, ResourceUsage};
pub use state::SimulationMetrics;
pub use trace::{Trace, TraceEntry, TraceKind, write_json_lines};
