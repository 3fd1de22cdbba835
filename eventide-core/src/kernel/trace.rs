//! Action trace recorded during a run.
//!
//! Every dispatched event and kernel action is appended as a
//! [`TraceEntry`]. Two runs with the same seed produce identical traces,
//! which is what determinism tests compare.

use std::io::Write;

use serde::{Deserialize, Serialize};

use super::clock::SimTime;
use super::error::SimulationError;
use super::events::Wakeup;
use super::process::ProcessId;
use super::resource::ResourceId;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceKind {
    /// Process created
    Spawned { name: String },
    /// Process resumed by an event
    Resumed { wakeup: Wakeup },
    /// Process asked for a slot
    Requested { resource: ResourceId },
    /// Request had to wait
    Queued { resource: ResourceId, position: usize },
    /// Slot handed to the process
    Granted { resource: ResourceId },
    /// Slot returned by the process
    Released { resource: ResourceId },
    /// Annotation written by the process body
    Mark { label: String, value: i64 },
    /// Process finished normally
    Completed,
    /// Process body returned an error
    Failed { reason: String },
}

impl TraceKind {
    /// Returns string representation of the entry kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceKind::Spawned { .. } => "spawned",
            TraceKind::Resumed { .. } => "resumed",
            TraceKind::Requested { .. } => "requested",
            TraceKind::Queued { .. } => "queued",
            TraceKind::Granted { .. } => "granted",
            TraceKind::Released { .. } => "released",
            TraceKind::Mark { .. } => "mark",
            TraceKind::Completed => "completed",
            TraceKind::Failed { .. } => "failed",
        }
    }
}

/// One trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Simulation time of the action
    pub time: SimTime,
    /// Process the action belongs to
    pub process: ProcessId,
    /// The action
    #[serde(flatten)]
    pub kind: TraceKind,
}

/// Bounded trace buffer.
#[derive(Debug, Clone)]
pub struct Trace {
    entries: Vec<TraceEntry>,
    limit: usize,
    dropped: u64,
}

impl Trace {
    /// Creates a trace keeping at most `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    /// Appends an entry, or counts it as dropped once the limit is reached.
    pub fn push(&mut self, time: SimTime, process: ProcessId, kind: TraceKind) {
        if self.entries.len() < self.limit {
            self.entries.push(TraceEntry {
                time,
                process,
                kind,
            });
        } else {
            self.dropped += 1;
        }
    }

    /// Returns recorded entries in order.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Returns number of entries that did not fit.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Writes entries as JSON Lines.
///
/// # Errors
///
/// - `SimulationError::Serialization` - Entry could not be encoded
/// - `SimulationError::Io` - Writer failed
pub fn write_json_lines<W: Write>(
    entries: &[TraceEntry],
    mut writer: W,
) -> Result<(), SimulationError> {
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
