use log::{error, warn};
use uuid::Uuid;

use super::dispatch::DispatchPolicy;
use super::log_io::LogTailer;
use super::model::{Alert, AlertState};
use super::parser::{self, ParsedAlert};
use super::registry::AlertRegistry;

/// Driver that moves lines from the tailer into the registry.
///
/// `tick` is scheduled at a fixed interval by the host; each tick drains the
/// tailer, parses every line, and admits the successes through the dispatch
/// policy. A malformed line is logged and skipped, never stopping the batch.
pub struct IngestionLoop {
    tailer: LogTailer,
    sequence: u32,
}

impl IngestionLoop {
    pub fn new(tailer: LogTailer) -> Self {
        Self { tailer, sequence: 0 }
    }

    pub fn tick(&mut self, registry: &mut AlertRegistry, policy: &mut DispatchPolicy) {
        let lines = self.poll_source();
        self.admit_batch(lines, registry, policy);
    }

    /// Drain the tailer. Pure file I/O — callers sharing the registry and
    /// policy behind locks should run this phase before taking either.
    pub fn poll_source(&mut self) -> Vec<String> {
        match self.tailer.poll() {
            Ok(lines) => lines,
            Err(err) => {
                warn!("failed to poll alert source: {err}");
                Vec::new()
            }
        }
    }

    pub fn admit_batch(
        &mut self,
        lines: Vec<String>,
        registry: &mut AlertRegistry,
        policy: &mut DispatchPolicy,
    ) {
        for line in lines {
            match parser::parse_line(&line) {
                Ok(parsed) => self.admit(parsed, registry, policy),
                Err(err) => warn!("skipping malformed line: {err}"),
            }
        }
    }

    fn admit(
        &mut self,
        parsed: ParsedAlert,
        registry: &mut AlertRegistry,
        policy: &mut DispatchPolicy,
    ) {
        self.sequence += 1;
        let mut alert = Alert {
            id: Uuid::new_v4(),
            name: parsed.name,
            serial: parsed.serial,
            timestamp: parsed.timestamp,
            position: parsed.position,
            label: parsed.label,
            sequence_code: format!("A-{:04}", self.sequence),
            state: AlertState::PendingDispatch,
            target: None,
        };
        policy.on_admit(&mut alert);
        if let Err(err) = registry.insert(alert) {
            // Only reachable on a v4 collision; the line is not retried.
            error!("dropping alert: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::testing::RecordingPort;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::tempdir;

    const TARGET: &str = "+441234567890";

    fn fixture(manual: bool) -> (tempfile::TempDir, std::path::PathBuf, IngestionLoop, AlertRegistry, DispatchPolicy, Arc<RecordingPort>) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sensors.csv");
        let port = Arc::new(RecordingPort::default());
        let policy = DispatchPolicy::new(port.clone(), TARGET, 3, manual);
        let loop_ = IngestionLoop::new(LogTailer::new(&path));
        (dir, path, loop_, AlertRegistry::new(), policy, port)
    }

    #[test]
    fn test_end_to_end_three_admissions() {
        let (_dir, path, mut ingest, mut registry, mut policy, port) = fixture(false);

        let mut file = File::create(&path).unwrap();
        for _ in 0..3 {
            writeln!(file, "Ranger1,SN1,1200,01/01/2024,51.5,-0.1,LABELLED AS INTRUDER").unwrap();
        }
        file.sync_all().unwrap();

        ingest.tick(&mut registry, &mut policy);

        assert_eq!(registry.len(), 3);
        let alerts = registry.list_all();
        assert_eq!(alerts[0].state, AlertState::PendingAcknowledgment);
        assert_eq!(alerts[1].state, AlertState::PendingAcknowledgment);
        assert_eq!(alerts[2].state, AlertState::InProgress);
        assert_eq!(alerts[2].target.as_deref(), Some(TARGET));
        assert_eq!(alerts[0].label, "INTRUDER");
        assert_eq!(alerts[0].sequence_code, "A-0001");
        assert_eq!(port.deliveries.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_lines_skipped_without_stopping_batch() {
        let (_dir, path, mut ingest, mut registry, mut policy, port) = fixture(false);

        let mut file = File::create(&path).unwrap();
        writeln!(file, "not,a,valid,line").unwrap();
        writeln!(file, "Ranger1,SN1,noon,01/01/2024,51.5,-0.1,Elephant").unwrap();
        writeln!(file, "Ranger2,SN2,1305,02/01/2024,12.1,4.5,Elephant").unwrap();
        file.sync_all().unwrap();

        ingest.tick(&mut registry, &mut policy);

        // Only the last line is well-formed; the bad ones left no trace.
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_all()[0].name, "Ranger2");
        assert_eq!(port.deliveries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_ticks_never_readmit_lines() {
        let (_dir, path, mut ingest, mut registry, mut policy, _port) = fixture(true);

        let mut file = File::create(&path).unwrap();
        writeln!(file, "Ranger1,SN1,1200,01/01/2024,51.5,-0.1,Elephant").unwrap();
        file.sync_all().unwrap();

        ingest.tick(&mut registry, &mut policy);
        ingest.tick(&mut registry, &mut policy);
        assert_eq!(registry.len(), 1);

        writeln!(file, "Ranger1,SN1,1201,01/01/2024,51.5,-0.1,Elephant").unwrap();
        file.sync_all().unwrap();
        ingest.tick(&mut registry, &mut policy);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list_all()[1].sequence_code, "A-0002");
    }

    #[test]
    fn test_split_phases_match_tick() {
        let (_dir, path, mut ingest, mut registry, mut policy, port) = fixture(false);

        let mut file = File::create(&path).unwrap();
        writeln!(file, "Ranger1,SN1,1200,01/01/2024,51.5,-0.1,Elephant").unwrap();
        writeln!(file, "Ranger2,SN2,1201,01/01/2024,51.5,-0.1,Elephant").unwrap();
        file.sync_all().unwrap();

        // Poll without touching the registry or policy, then admit.
        let lines = ingest.poll_source();
        assert_eq!(lines.len(), 2);
        assert!(registry.is_empty());

        ingest.admit_batch(lines, &mut registry, &mut policy);
        assert_eq!(registry.len(), 2);
        assert_eq!(port.deliveries.lock().unwrap().len(), 2);

        // The batch consumed the cursor: a follow-up poll is empty.
        assert!(ingest.poll_source().is_empty());
    }

    #[test]
    fn test_missing_source_is_quiet() {
        let (_dir, _path, mut ingest, mut registry, mut policy, _port) = fixture(false);
        ingest.tick(&mut registry, &mut policy);
        assert!(registry.is_empty());
    }
}
