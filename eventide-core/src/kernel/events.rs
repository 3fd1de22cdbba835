//! Event types and the time-ordered event queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::clock::{SimClock, SimTime};
use super::error::SimulationError;
use super::process::ProcessId;
use super::resource::ResourceId;

/// Reason a process is being resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wakeup {
    /// First resumption after spawn
    Start,
    /// A requested timeout elapsed
    Timeout,
    /// A slot of the resource was granted
    Granted(ResourceId),
}

impl Wakeup {
    /// Returns string representation of the wakeup for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Wakeup::Start => "Start",
            Wakeup::Timeout => "Timeout",
            Wakeup::Granted(_) => "Granted",
        }
    }
}

/// Monotonic event sequence number.
///
/// Assigned at scheduling time; breaks ties between events at the
/// same instant so that they dispatch in the order they were scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Scheduled resumption of a process.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// Unique event ID for deterministic ordering
    pub id: EventId,
    /// Scheduled execution time
    pub time: SimTime,
    /// Process to resume
    pub process: ProcessId,
    /// Why the process is resumed
    pub wakeup: Wakeup,
}

impl Eq for ScheduledEvent {}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earlier time first, then earlier sequence number.
        // Reversed for min-heap behavior.
        self.time
            .cmp(&other.time)
            .then_with(|| self.id.cmp(&other.id))
            .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending events ordered by time, owning the simulation clock.
///
/// Popping an event advances the clock to that event's time before the
/// event is handed out.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    clock: SimClock,
    next_event_id: u64,
}

impl EventQueue {
    /// Creates an empty queue with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns current simulation time.
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Schedules a resumption at an absolute time.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTime` - `time` is before the current clock
    pub fn schedule(
        &mut self,
        time: SimTime,
        process: ProcessId,
        wakeup: Wakeup,
    ) -> Result<EventId, SimulationError> {
        if time < self.clock.now() {
            return Err(SimulationError::InvalidTime {
                reason: format!(
                    "cannot schedule at {} before current time {}",
                    time,
                    self.clock.now()
                ),
            });
        }

        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        self.heap.push(ScheduledEvent {
            id,
            time,
            process,
            wakeup,
        });

        Ok(id)
    }

    /// Removes the earliest event and advances the clock to its time.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTime` - Queued event lies before the clock
    pub fn pop_next(&mut self) -> Result<Option<ScheduledEvent>, SimulationError> {
        let Some(event) = self.heap.pop() else {
            return Ok(None);
        };
        self.clock.advance_to(event.time)?;
        Ok(Some(event))
    }

    /// Returns the time of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|event| event.time)
    }

    /// Moves the clock forward without dispatching anything.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTime` - Target is before the clock, or a pending event would be skipped
    pub fn advance_to(&mut self, target: SimTime) -> Result<(), SimulationError> {
        if let Some(next) = self.peek_time()
            && next < target
        {
            return Err(SimulationError::InvalidTime {
                reason: format!("advancing to {target} would skip event at {next}"),
            });
        }
        self.clock.advance_to(target)
    }

    /// Reports whether any event remains.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
