//! Event Logger - appends workflow events to JSONL files
//!
//! Events land in `<data_dir>/draftgate/runs/{run-id}/events.jsonl`. The
//! trail is write-only; runs never resume from it.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, WorkflowEvent};

pub struct EventLogger {
    runs_dir: PathBuf,
    /// Open file writers per run
    writers: HashMap<String, BufWriter<File>>,
}

impl EventLogger {
    pub fn new(runs_dir: impl AsRef<Path>) -> Self {
        let runs_dir = runs_dir.as_ref().to_path_buf();
        debug!(?runs_dir, "EventLogger::new: creating logger");
        Self {
            runs_dir,
            writers: HashMap::new(),
        }
    }

    /// Default runs directory under the platform data dir
    pub fn default_runs_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| eyre!("Could not determine data directory"))?;
        Ok(data_dir.join("draftgate").join("runs"))
    }

    fn writer_for(&mut self, run_id: &str) -> Result<&mut BufWriter<File>> {
        if !self.writers.contains_key(run_id) {
            let run_dir = self.runs_dir.join(run_id);
            fs::create_dir_all(&run_dir)?;

            let log_path = run_dir.join("events.jsonl");
            debug!(?log_path, "EventLogger: creating new log file");

            let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
            self.writers.insert(run_id.to_string(), BufWriter::new(file));
        }
        self.writers
            .get_mut(run_id)
            .ok_or_else(|| eyre!("No log writer for run {}", run_id))
    }

    /// Append an event to its run's log file
    pub fn write_event(&mut self, event: &WorkflowEvent) -> Result<()> {
        let run_id = event.run_id();
        debug!(%run_id, event_type = event.event_type(), "EventLogger::write_event");

        let json = serde_json::to_string(&EventLogEntry::new(event.clone()))?;
        let writer = self.writer_for(run_id)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    /// Close the writer for a finished run
    pub fn close_run(&mut self, run_id: &str) {
        debug!(%run_id, "EventLogger::close_run");
        if let Some(mut writer) = self.writers.remove(run_id) {
            let _ = writer.flush();
        }
    }

    /// Consume events until every sender is gone
    pub async fn run(mut self, mut rx: broadcast::Receiver<WorkflowEvent>) {
        debug!("EventLogger::run: starting event logger");
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.write_event(&event) {
                        error!(run_id = event.run_id(), error = %e, "EventLogger: failed to write event");
                    }
                    if event.is_final() {
                        self.close_run(event.run_id());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }

        for (run_id, mut writer) in self.writers.drain() {
            debug!(%run_id, "EventLogger: flushing writer on shutdown");
            let _ = writer.flush();
        }
    }
}

/// Read back a run's log entries
pub fn read_run_events(runs_dir: impl AsRef<Path>, run_id: &str) -> Result<Vec<EventLogEntry>> {
    let log_path = runs_dir.as_ref().join(run_id).join("events.jsonl");
    debug!(?log_path, "read_run_events: reading log file");

    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&log_path)?;
    let mut entries = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(line, error = %e, "read_run_events: failed to parse line"),
        }
    }
    Ok(entries)
}

/// Spawn a logger writing under `runs_dir`
///
/// Subscribes before returning, so no event emitted afterwards is missed.
pub fn spawn_event_logger(bus: &EventBus, runs_dir: impl AsRef<Path>) -> Result<tokio::task::JoinHandle<()>> {
    fs::create_dir_all(runs_dir.as_ref())?;
    let logger = EventLogger::new(runs_dir);
    let rx = bus.subscribe();
    Ok(tokio::spawn(logger.run(rx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RunState;
    use tempfile::tempdir;

    fn started(run_id: &str) -> WorkflowEvent {
        WorkflowEvent::RunStarted {
            run_id: run_id.to_string(),
            task: "write a slogan".to_string(),
        }
    }

    #[test]
    fn test_write_event() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());

        logger.write_event(&started("run-123")).unwrap();

        let log_path = temp.path().join("run-123").join("events.jsonl");
        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("RunStarted"));
        assert!(content.contains("run-123"));
    }

    #[test]
    fn test_events_append_per_run() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());

        logger.write_event(&started("run-1")).unwrap();
        logger.write_event(&started("run-2")).unwrap();
        logger
            .write_event(&WorkflowEvent::Output {
                run_id: "run-1".to_string(),
                output: "Drive Bold.".to_string(),
            })
            .unwrap();

        let run1 = read_run_events(temp.path(), "run-1").unwrap();
        assert_eq!(run1.len(), 2);
        assert_eq!(run1[0].event.event_type(), "RunStarted");
        assert_eq!(run1[1].event.event_type(), "Output");
        assert_eq!(read_run_events(temp.path(), "run-2").unwrap().len(), 1);
    }

    #[test]
    fn test_read_nonexistent_run() {
        let temp = tempdir().unwrap();
        assert!(read_run_events(temp.path(), "nope").unwrap().is_empty());
    }

    #[test]
    fn test_close_run() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());
        logger.write_event(&started("run-close")).unwrap();

        assert!(logger.writers.contains_key("run-close"));
        logger.close_run("run-close");
        assert!(!logger.writers.contains_key("run-close"));
    }

    #[tokio::test]
    async fn test_spawned_logger_drains_on_close() {
        let temp = tempdir().unwrap();
        let bus = EventBus::new(16);
        let handle = spawn_event_logger(&bus, temp.path()).unwrap();

        let emitter = bus.emitter_for("run-bg");
        emitter.emit(started("run-bg"));
        emitter.emit(WorkflowEvent::Status {
            run_id: "run-bg".to_string(),
            state: RunState::Completed,
        });
        drop(emitter);
        drop(bus);
        handle.await.unwrap();

        let entries = read_run_events(temp.path(), "run-bg").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].event.is_final());
    }
}
