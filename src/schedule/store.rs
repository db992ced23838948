//! Store adapters: where the scheduler's slots and events come from.
//!
//! The scheduler treats a store as a read-only snapshot source. The sync layer that
//! fills the store (HTTP, websocket pushes) lives outside this crate; it only has to
//! leave a JSON document behind, or drive a [`MemoryStore`] when embedded.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{Event, ScheduleSlot};
use crate::common::utils::private_path;

/// Version of the stored data, compared by the driving loop to decide when to reload.
///
/// Opaque apart from ordering. `ZERO` means "no data yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct ModificationMarker(u128);

impl ModificationMarker {
    pub const ZERO: ModificationMarker = ModificationMarker(0);

    /// Marker from a file modification time (nanoseconds since the epoch).
    pub fn from_system_time(time: SystemTime) -> Self {
        let nanos = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        ModificationMarker(nanos)
    }

    /// Marker from a monotonically increasing write counter.
    pub fn from_counter(counter: u64) -> Self {
        ModificationMarker(counter as u128)
    }
}

/// Source of schedule data for the scheduler.
#[cfg_attr(test, mockall::automock)]
pub trait SlotStore: Send {
    fn list_slots(&self) -> Result<Vec<ScheduleSlot>>;

    fn list_events(&self) -> Result<Vec<Event>>;

    /// Current data version; advances whenever slots or events change.
    fn modification_marker(&self) -> Result<ModificationMarker>;

    /// Fetch slots and events together. Stores that can read both from one
    /// consistent snapshot override this.
    fn fetch(&self) -> Result<(Vec<ScheduleSlot>, Vec<Event>)> {
        Ok((self.list_slots()?, self.list_events()?))
    }

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Store backed by a JSON document of the form `{"slots": [...], "events": [...]}`.
///
/// Records that fail to decode are skipped with a warning so one bad row from the
/// sync layer never blanks the whole screen. A missing file reads as empty.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Option<serde_json::Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read schedule from {}", private_path(&self.path)))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let document = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse schedule in {}", private_path(&self.path)))?;
        Ok(Some(document))
    }
}

/// Decode every element of `document[key]`, skipping (and logging) bad records.
fn decode_records<T: DeserializeOwned>(document: Option<&serde_json::Value>, key: &str) -> Vec<T> {
    let Some(records) = document
        .and_then(|doc| doc.get(key))
        .and_then(|value| value.as_array())
    else {
        return Vec::new();
    };

    records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| match T::deserialize(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                let id = record
                    .get("id")
                    .or_else(|| record.get("uuid"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("?");
                log_warning!("Skipping {} record #{} ({}): {}", key, idx, id, e);
                None
            }
        })
        .collect()
}

impl SlotStore for JsonFileStore {
    fn list_slots(&self) -> Result<Vec<ScheduleSlot>> {
        let document = self.read_document()?;
        Ok(decode_records(document.as_ref(), "slots"))
    }

    fn list_events(&self) -> Result<Vec<Event>> {
        let document = self.read_document()?;
        Ok(decode_records(document.as_ref(), "events"))
    }

    fn fetch(&self) -> Result<(Vec<ScheduleSlot>, Vec<Event>)> {
        let document = self.read_document()?;
        Ok((
            decode_records(document.as_ref(), "slots"),
            decode_records(document.as_ref(), "events"),
        ))
    }

    fn modification_marker(&self) -> Result<ModificationMarker> {
        match std::fs::metadata(&self.path) {
            Ok(metadata) => {
                let modified = metadata.modified().with_context(|| {
                    format!("Failed to read mtime of {}", private_path(&self.path))
                })?;
                Ok(ModificationMarker::from_system_time(modified))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ModificationMarker::ZERO),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to stat {}", private_path(&self.path))),
        }
    }

    fn describe(&self) -> String {
        private_path(&self.path)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    slots: Vec<ScheduleSlot>,
    events: Vec<Event>,
    version: u64,
}

/// In-memory store shared between a writer and the scheduler.
///
/// Clones share the same data. Every write bumps the marker.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(slots: Vec<ScheduleSlot>, events: Vec<Event>) -> Self {
        let store = Self::new();
        store.replace(slots, events);
        store
    }

    fn update(&self, apply: impl FnOnce(&mut MemoryState)) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        apply(&mut state);
        state.version += 1;
    }

    pub fn replace(&self, slots: Vec<ScheduleSlot>, events: Vec<Event>) {
        self.update(|state| {
            state.slots = slots;
            state.events = events;
        });
    }

    pub fn set_slots(&self, slots: Vec<ScheduleSlot>) {
        self.update(|state| state.slots = slots);
    }

    pub fn set_events(&self, events: Vec<Event>) {
        self.update(|state| state.events = events);
    }

    /// Bump the marker without changing any data (a sync that found nothing new).
    pub fn touch(&self) {
        self.update(|_| {});
    }
}

impl SlotStore for MemoryStore {
    fn list_slots(&self) -> Result<Vec<ScheduleSlot>> {
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()).slots.clone())
    }

    fn list_events(&self) -> Result<Vec<Event>> {
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()).events.clone())
    }

    fn fetch(&self) -> Result<(Vec<ScheduleSlot>, Vec<Event>)> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok((state.slots.clone(), state.events.clone()))
    }

    fn modification_marker(&self) -> Result<ModificationMarker> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(ModificationMarker::from_counter(state.version))
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use std::fs;
    use tempfile::tempdir;

    fn slot(id: &str) -> ScheduleSlot {
        ScheduleSlot::new(id, "tpl", Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap())
    }

    #[test]
    fn test_missing_file_reads_empty_with_zero_marker() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("schedule.json"));

        assert!(store.list_slots().unwrap().is_empty());
        assert!(store.list_events().unwrap().is_empty());
        assert_eq!(store.modification_marker().unwrap(), ModificationMarker::ZERO);
    }

    #[test]
    fn test_json_store_skips_bad_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        fs::write(
            &path,
            r#"{
                "slots": [
                    {"uuid": "a", "template_uuid": "t", "start_time": "09:00", "weekday": "Monday"},
                    {"uuid": "b", "template_uuid": "t", "start_time": "10:00", "weekday": "Someday"}
                ],
                "events": [
                    {"uuid": "e1", "event_start": "2024-01-01T10:00:00+00:00", "event_end": "2024-01-01T12:00:00+00:00"},
                    {"uuid": "e2", "event_start": "soon", "event_end": "later"}
                ]
            }"#,
        )
        .unwrap();

        let store = JsonFileStore::new(&path);
        let (slots, events) = store.fetch().unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "a");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "e1");
        assert!(store.modification_marker().unwrap() > ModificationMarker::ZERO);
    }

    #[test]
    fn test_json_store_rejects_malformed_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.list_slots().unwrap_err();
        assert!(err.to_string().contains("Failed to parse schedule"));
    }

    #[test]
    fn test_memory_store_marker_advances_on_every_write() {
        let store = MemoryStore::new();
        let before = store.modification_marker().unwrap();

        store.set_slots(vec![slot("a")]);
        let after_slots = store.modification_marker().unwrap();
        assert!(after_slots > before);

        store.touch();
        assert!(store.modification_marker().unwrap() > after_slots);
        assert_eq!(store.list_slots().unwrap(), vec![slot("a")]);
    }

    #[test]
    fn test_memory_store_clones_share_data() {
        let writer = MemoryStore::new();
        let reader = writer.clone();
        writer.set_slots(vec![slot("shared")]);
        assert_eq!(reader.list_slots().unwrap()[0].id, "shared");
    }
}
