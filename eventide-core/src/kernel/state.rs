//! Metrics collected while the environment runs.

use std::collections::BTreeMap;

use super::invariants::InvariantViolation;

/// Metrics collected during simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulationMetrics {
    /// Total events processed
    pub events_processed: u64,
    /// Events by wakeup kind
    pub events_by_type: BTreeMap<String, u64>,
    /// Processes created
    pub processes_spawned: u64,
    /// Processes that finished normally
    pub processes_completed: u64,
    /// Processes whose body returned an error
    pub processes_failed: u64,
    /// Peak number of pending events
    pub peak_queue_len: usize,
    /// Invariant violations detected
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationMetrics {
    /// Creates new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event being processed.
    pub fn record_event(&mut self, event_type_str: &str) {
        self.events_processed += 1;
        *self
            .events_by_type
            .entry(event_type_str.to_string())
            .or_insert(0) += 1;
    }

    /// Records a spawned process.
    pub fn record_spawn(&mut self) {
        self.processes_spawned += 1;
    }

    /// Records a completed process.
    pub fn record_completion(&mut self) {
        self.processes_completed += 1;
    }

    /// Records a failed process.
    pub fn record_failure(&mut self) {
        self.processes_failed += 1;
    }

    /// Updates peak queue length.
    pub fn update_peak_queue_len(&mut self, current_len: usize) {
        if current_len > self.peak_queue_len {
            self.peak_queue_len = current_len;
        }
    }

    /// Records an invariant violation.
    pub fn record_invariant_violation(&mut self, violation: InvariantViolation) {
        self.invariant_violations.push(violation);
    }

    /// Generates summary statistics.
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("Events processed: {}\n", self.events_processed));
        summary.push_str(&format!("Processes spawned: {}\n", self.processes_spawned));
        summary.push_str(&format!(
            "Processes completed: {}\n",
            self.processes_completed
        ));
        summary.push_str(&format!("Processes failed: {}\n", self.processes_failed));
        summary.push_str(&format!("Peak queue length: {}\n", self.peak_queue_len));
        summary.push_str(&format!(
            "Invariant violations: {}\n",
            self.invariant_violations.len()
        ));

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_event_recording() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_event("Start");
        metrics.record_event("Start");
        metrics.record_event("Timeout");

        assert_eq!(metrics.events_processed, 3);
        assert_eq!(metrics.events_by_type["Start"], 2);
        assert_eq!(metrics.events_by_type["Timeout"], 1);
    }

    #[test]
    fn test_metrics_process_counters() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_spawn();
        metrics.record_spawn();
        metrics.record_completion();
        metrics.record_failure();
        metrics.update_peak_queue_len(4);
        metrics.update_peak_queue_len(2);

        assert_eq!(metrics.processes_spawned, 2);
        assert_eq!(metrics.processes_completed, 1);
        assert_eq!(metrics.processes_failed, 1);
        assert_eq!(metrics.peak_queue_len, 4);
        assert!(metrics.summary().contains("Processes failed: 1"));
    }
}
