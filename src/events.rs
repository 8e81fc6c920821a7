use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

use crate::model::{EventStatus, LookupEvent};
use crate::util::{ensure_directory, utc_compact_string};

pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

pub trait EventSink: Send + Sync {
    fn record(&self, event: LookupEvent);
}

#[derive(Debug, Default)]
struct EventLogState {
    entries: VecDeque<LookupEvent>,
    next_seq: u64,
}

// Bounded in-memory buffer with optional append-only JSONL mirror.
#[derive(Debug)]
pub struct MemoryEventLog {
    capacity: usize,
    file_path: Option<PathBuf>,
    state: Mutex<EventLogState>,
}

impl MemoryEventLog {
    pub fn new(capacity: usize, file_path: Option<PathBuf>) -> Self {
        Self {
            capacity: capacity.max(1),
            file_path,
            state: Mutex::new(EventLogState::default()),
        }
    }

    pub fn with_history(capacity: usize, file_path: PathBuf) -> Result<Self> {
        let history = read_event_file(&file_path)?;
        let log = Self::new(capacity, Some(file_path));
        {
            let mut state = log.lock();
            state.next_seq = history.len() as u64;
            state.entries = history.into_iter().collect();
            while state.entries.len() > log.capacity {
                state.entries.pop_front();
            }
        }
        Ok(log)
    }

    pub fn snapshot(&self) -> Vec<LookupEvent> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn by_action(&self, action: &str) -> Vec<LookupEvent> {
        self.lock()
            .entries
            .iter()
            .filter(|event| event.action == action)
            .cloned()
            .collect()
    }

    pub fn by_status(&self, status: EventStatus) -> Vec<LookupEvent> {
        self.lock()
            .entries
            .iter()
            .filter(|event| event.status == status)
            .cloned()
            .collect()
    }

    // Also truncates the mirror file, when there is one.
    pub fn clear(&self) -> Result<()> {
        self.lock().entries.clear();
        if let Some(path) = self.file_path.as_deref().filter(|path| path.exists()) {
            fs::write(path, b"")
                .with_context(|| format!("failed to truncate event log: {}", path.display()))?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, EventLogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append_to_file(&self, path: &Path, event: &LookupEvent) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            ensure_directory(parent)?;
        }

        let mut line = serde_json::to_vec(event).context("failed to serialize event")?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open event log: {}", path.display()))?;
        file.write_all(&line)
            .with_context(|| format!("failed to append event log: {}", path.display()))
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, mut event: LookupEvent) {
        {
            let mut state = self.lock();
            state.next_seq += 1;
            if event.id.is_empty() {
                event.id = format!("{}-{}", utc_compact_string(Utc::now()), state.next_seq);
            }
            state.entries.push_back(event.clone());
            while state.entries.len() > self.capacity {
                state.entries.pop_front();
            }
        }

        if let Some(path) = &self.file_path
            && let Err(err) = self.append_to_file(path, &event)
        {
            warn!(error = %err, action = %event.action, "failed to persist event");
        }
    }
}

pub fn read_event_file(path: &Path) -> Result<Vec<LookupEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<LookupEvent>(line).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(action: &str, status: EventStatus) -> LookupEvent {
        LookupEvent::new(action, json!({"gush": "6166"}), json!(null), status)
    }

    #[test]
    fn memory_log_evicts_oldest_entries_past_capacity() {
        let log = MemoryEventLog::new(2, None);
        log.record(event("first", EventStatus::Success));
        log.record(event("second", EventStatus::Success));
        log.record(event("third", EventStatus::Error));

        let actions = log
            .snapshot()
            .into_iter()
            .map(|event| event.action)
            .collect::<Vec<String>>();
        assert_eq!(actions, vec!["second", "third"]);
    }

    #[test]
    fn memory_log_assigns_unique_ids_and_filters() {
        let log = MemoryEventLog::new(DEFAULT_EVENT_CAPACITY, None);
        log.record(event("tabanow.discover", EventStatus::Success));
        log.record(event("tabanow.discover", EventStatus::Error).with_error("boom"));
        log.record(event("tabanow.enrich", EventStatus::Success));

        let snapshot = log.snapshot();
        assert_ne!(snapshot[0].id, snapshot[1].id);
        assert_eq!(log.by_action("tabanow.discover").len(), 2);
        assert_eq!(log.by_status(EventStatus::Error).len(), 1);
        assert_eq!(
            log.by_status(EventStatus::Error)[0].error.as_deref(),
            Some("boom")
        );

        log.clear().unwrap();
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn memory_log_mirrors_events_to_jsonl_file() {
        let dir = std::env::temp_dir().join(format!(
            "reguscape-events-{}-{}",
            std::process::id(),
            utc_compact_string(Utc::now())
        ));
        let path = dir.join("events.log");

        let log = MemoryEventLog::new(10, Some(path.clone()));
        log.record(event("lookup.taba_info", EventStatus::Success));
        log.record(event("lookup.taba_info", EventStatus::Pending));
        fs::write(
            &path,
            format!("{}not json\n", fs::read_to_string(&path).unwrap()),
        )
        .unwrap();

        let persisted = read_event_file(&path).unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[1].status, EventStatus::Pending);

        let reopened = MemoryEventLog::with_history(1, path.clone()).unwrap();
        assert_eq!(reopened.snapshot().len(), 1);
        assert_eq!(reopened.snapshot()[0].status, EventStatus::Pending);

        reopened.clear().unwrap();
        assert!(read_event_file(&path).unwrap().is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn read_event_file_returns_empty_for_missing_file() {
        let path = std::env::temp_dir().join("reguscape-missing-events.log");
        assert!(read_event_file(&path).unwrap().is_empty());
    }
}
