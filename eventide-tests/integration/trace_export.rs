//! JSON Lines trace export.

use std::fs::{self, File};
use std::io::BufWriter;

use eventide_core::kernel::{TraceEntry, TraceKind, write_json_lines};
use eventide_core::SimulationConfig;
use eventide_sim::{ChainConfig, run_chain_with};
use tempfile::TempDir;

#[test]
fn test_trace_file_reads_back_entry_for_entry() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("trace.jsonl");

    let (report, _) = run_chain_with(SimulationConfig::seeded(12), &ChainConfig::default()).unwrap();
    write_json_lines(&report.trace, BufWriter::new(File::create(&path).unwrap())).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let entries: Vec<TraceEntry> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(entries.len(), report.trace.len());
    assert_eq!(entries, report.trace);
}

#[test]
fn test_trace_lines_are_flat_objects() {
    let (report, _) = run_chain_with(SimulationConfig::seeded(12), &ChainConfig::default()).unwrap();
    let mut buffer = Vec::new();
    write_json_lines(&report.trace[..3], &mut buffer).unwrap();

    let text = String::from_utf8(buffer).unwrap();
    let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(first["time"], 0.0);
    assert_eq!(first["kind"], "spawned");
    assert_eq!(first["name"], "generator");
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_trace_limit_drops_tail() {
    let config = SimulationConfig::seeded(12).with_trace_limit(10);
    let (report, chain) = run_chain_with(config, &ChainConfig::default()).unwrap();

    assert_eq!(report.trace.len(), 10);
    assert!(report.trace_dropped > 0);
    assert!(matches!(report.trace[0].kind, TraceKind::Spawned { .. }));
    // the run itself is unaffected, only the record of it
    assert!(report.success);
    assert!(chain.final_values().len() < 5);
    assert!(!chain.is_complete());
    assert_eq!(chain.trace_dropped(), report.trace_dropped);
}

#[test]
fn test_trace_file_with_invalid_time_is_rejected() {
    let line = r#"{"time":-3.0,"process":1,"kind":"completed"}"#;
    assert!(serde_json::from_str::<TraceEntry>(line).is_err());

    let line = r#"{"time":3.0,"process":1,"kind":"completed"}"#;
    let entry: TraceEntry = serde_json::from_str(line).unwrap();
    assert_eq!(entry.time.as_f64(), 3.0);
    assert_eq!(entry.kind, TraceKind::Completed);
}
