//! Chain-level view of a run, rebuilt from the kernel trace.

use std::collections::{BTreeMap, HashMap};

use eventide_core::{SimTime, SimulationReport};
use eventide_core::kernel::{ProcessId, TraceEntry, TraceKind};
use serde::Serialize;

use super::stages::{ENTER_LABEL, EXIT_LABEL, parse_stage_process_name};

/// What one item did in one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    /// Item name
    pub item: String,
    /// Stage label
    pub stage: String,
    /// Stage process
    pub process: ProcessId,
    /// When the resource was acquired
    pub entered: Option<SimTime>,
    /// When the resource was released
    pub exited: Option<SimTime>,
    /// Item counter after the stage
    pub value: i64,
}

/// Stage records of every item, with entry and exit order.
///
/// Only as complete as the trace it was built from: when the run dropped
/// trace entries, later stages are missing and `complete` is false.
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    complete: bool,
    trace_dropped: u64,
    records: Vec<StageRecord>,
    entries: Vec<usize>,
    exits: Vec<usize>,
}

impl Default for ChainReport {
    fn default() -> Self {
        Self {
            complete: true,
            trace_dropped: 0,
            records: Vec::new(),
            entries: Vec::new(),
            exits: Vec::new(),
        }
    }
}

impl ChainReport {
    /// Rebuilds stage records from a finished run, noting dropped trace entries.
    pub fn from_report(report: &SimulationReport) -> Self {
        let mut chain = Self::from_trace(&report.trace);
        chain.trace_dropped = report.trace_dropped;
        chain.complete = report.trace_dropped == 0;
        chain
    }

    /// Whether every trace entry of the run was available.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Trace entries the run dropped past its trace limit.
    pub fn trace_dropped(&self) -> u64 {
        self.trace_dropped
    }

    /// Rebuilds stage records from trace entries.
    ///
    /// Processes whose names are not stage names (the generator) are ignored.
    pub fn from_trace(trace: &[TraceEntry]) -> Self {
        let mut report = Self::default();
        let mut by_process: HashMap<ProcessId, usize> = HashMap::new();

        for entry in trace {
            match &entry.kind {
                TraceKind::Spawned { name } => {
                    if let Some((item, stage)) = parse_stage_process_name(name) {
                        by_process.insert(entry.process, report.records.len());
                        report.records.push(StageRecord {
                            item: item.to_string(),
                            stage: stage.to_string(),
                            process: entry.process,
                            entered: None,
                            exited: None,
                            value: 0,
                        });
                    }
                }
                TraceKind::Mark { label, value } => {
                    let Some(&index) = by_process.get(&entry.process) else {
                        continue;
                    };
                    let record = &mut report.records[index];
                    if label == ENTER_LABEL {
                        record.entered = Some(entry.time);
                        record.value = *value;
                        report.entries.push(index);
                    } else if label == EXIT_LABEL {
                        record.exited = Some(entry.time);
                        record.value = *value;
                        report.exits.push(index);
                    }
                }
                _ => {}
            }
        }

        report
    }

    /// Returns all stage records in spawn order.
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Items in the order they acquired `stage`.
    pub fn entry_order(&self, stage: &str) -> Vec<&str> {
        self.ordered(&self.entries, stage)
    }

    /// Items in the order they released `stage`.
    pub fn exit_order(&self, stage: &str) -> Vec<&str> {
        self.ordered(&self.exits, stage)
    }

    fn ordered(&self, indices: &[usize], stage: &str) -> Vec<&str> {
        indices
            .iter()
            .map(|&index| &self.records[index])
            .filter(|record| record.stage == stage)
            .map(|record| record.item.as_str())
            .collect()
    }

    /// Counter value of each item after the last stage it left.
    pub fn final_values(&self) -> BTreeMap<String, i64> {
        let mut values = BTreeMap::new();
        for &index in &self.exits {
            let record = &self.records[index];
            values.insert(record.item.clone(), record.value);
        }
        values
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::from("Chain stages:\n");
        if !self.complete {
            summary.push_str(&format!(
                "  INCOMPLETE: {} trace entries dropped, stages below are partial\n",
                self.trace_dropped
            ));
        }
        for record in &self.records {
            let entered = record
                .entered
                .map_or_else(|| "-".to_string(), |time| time.to_string());
            let exited = record
                .exited
                .map_or_else(|| "-".to_string(), |time| time.to_string());
            summary.push_str(&format!(
                "  {}/{}: entered {entered}, exited {exited}, value {}\n",
                record.item, record.stage, record.value
            ));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(time: f64, process: u64, kind: TraceKind) -> TraceEntry {
        TraceEntry {
            time: SimTime::new(time).unwrap(),
            process: ProcessId::new(process),
            kind,
        }
    }

    fn mark(label: &str, value: i64) -> TraceKind {
        TraceKind::Mark {
            label: label.to_string(),
            value,
        }
    }

    fn spawned(name: &str) -> TraceKind {
        TraceKind::Spawned {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_records_from_trace() {
        let trace = vec![
            entry(0.0, 0, spawned("generator")),
            entry(0.0, 1, spawned("item-0/A")),
            entry(0.0, 1, mark(ENTER_LABEL, 1)),
            entry(1.0, 2, spawned("item-1/A")),
            entry(2.0, 1, mark(EXIT_LABEL, 1)),
            entry(2.0, 3, spawned("item-0/B")),
            entry(2.0, 2, mark(ENTER_LABEL, 1)),
            entry(2.0, 3, mark(ENTER_LABEL, 2)),
            entry(3.0, 2, mark(EXIT_LABEL, 1)),
            entry(4.0, 3, mark(EXIT_LABEL, 2)),
        ];

        let report = ChainReport::from_trace(&trace);

        assert_eq!(report.records().len(), 3);
        assert_eq!(report.entry_order("A"), vec!["item-0", "item-1"]);
        assert_eq!(report.exit_order("A"), vec!["item-0", "item-1"]);
        assert_eq!(report.entry_order("B"), vec!["item-0"]);

        let values = report.final_values();
        assert_eq!(values["item-0"], 2);
        assert_eq!(values["item-1"], 1);

        let b = &report.records()[2];
        assert_eq!(b.entered.map(SimTime::as_f64), Some(2.0));
        assert_eq!(b.exited.map(SimTime::as_f64), Some(4.0));
        assert!(report.summary().contains("item-0/B: entered 2.000, exited 4.000, value 2"));
    }

    #[test]
    fn test_from_report_flags_dropped_entries() {
        let (report, _) = crate::run_chain_with(
            eventide_core::SimulationConfig::seeded(4).with_trace_limit(12),
            &crate::ChainConfig::default(),
        )
        .unwrap();

        let chain = ChainReport::from_report(&report);
        assert!(!chain.is_complete());
        assert_eq!(chain.trace_dropped(), report.trace_dropped);
        assert!(chain.summary().contains("INCOMPLETE"));

        assert!(ChainReport::from_trace(&report.trace).is_complete());
    }

    #[test]
    fn test_unrelated_marks_are_ignored() {
        let trace = vec![
            entry(0.0, 0, spawned("generator")),
            entry(0.0, 0, mark(ENTER_LABEL, 9)),
        ];

        let report = ChainReport::from_trace(&trace);
        assert!(report.records().is_empty());
        assert!(report.final_values().is_empty());
    }
}
