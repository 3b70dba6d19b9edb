#![deny(warnings)]

//! Persistence layer: snapshot codec, save gateways and the SQLite archive.
//!
//! The live save is a single versionless JSON document stored under one
//! fixed key. Older documents are accepted: missing fields get defaults and
//! legacy field names (`purity`, `social`) are mapped to their successors.

pub mod archive;

use pet_core::{normalize, Equipped, GameState, Upgrades, DEFAULT_NAME, NEED_MAX};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Storage key of the live save.
pub const SAVE_KEY: &str = "dropli_save";

/// Errors raised by gateways and the archive.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Durable key-value home of the live save.
///
/// Implementors only move opaque payloads; encoding and the lenient decoding
/// of older snapshots live in the provided `load`/`save` methods.
pub trait PersistenceGateway: Send {
    /// Stored payload, `None` when nothing was saved yet.
    fn read(&self) -> Result<Option<String>, PersistenceError>;

    /// Overwrite the stored payload in place.
    fn write(&mut self, payload: &str) -> Result<(), PersistenceError>;

    /// Load and decode the snapshot. `now_ms` anchors snapshots that lack a
    /// timestamp.
    fn load(&self, now_ms: i64) -> Result<Option<GameState>, PersistenceError> {
        match self.read()? {
            Some(text) => decode_snapshot(&text, now_ms).map(Some),
            None => Ok(None),
        }
    }

    /// Encode and store the snapshot.
    fn save(&mut self, state: &GameState) -> Result<(), PersistenceError> {
        let payload = encode_snapshot(state)?;
        self.write(&payload)
    }
}

/// Serialize a state with its stable field names.
pub fn encode_snapshot(state: &GameState) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(state)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUpgrades {
    click_power: Option<f64>,
    auto_gather: Option<f64>,
    resilience: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    name: Option<String>,
    minerals: Option<f64>,
    purity: Option<f64>,
    hydration: Option<f64>,
    happiness: Option<f64>,
    sleep: Option<f64>,
    social: Option<f64>,
    xp: Option<f64>,
    level: Option<f64>,
    last_timestamp: Option<f64>,
    dewdrops: Option<f64>,
    is_sleeping: Option<bool>,
    inventory: Option<Vec<String>>,
    equipped: Option<Equipped>,
    upgrades: Option<RawUpgrades>,
}

fn need_value(v: Option<f64>) -> u8 {
    match v {
        Some(x) if x.is_finite() => x.round().clamp(0.0, f64::from(NEED_MAX)) as u8,
        _ => NEED_MAX,
    }
}

fn counter(v: Option<f64>) -> u32 {
    match v {
        Some(x) if x.is_finite() && x > 0.0 => x.floor().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

fn non_negative(v: Option<f64>) -> f64 {
    match v {
        Some(x) if x.is_finite() && x > 0.0 => x,
        _ => 0.0,
    }
}

/// Decode a snapshot written by any earlier version.
///
/// Unknown fields are ignored, missing ones take the defaults of a fresh pet,
/// values are clamped into their valid ranges and evolution is recomputed
/// from the level. Fails only when the text is not a JSON object of the
/// expected shape.
pub fn decode_snapshot(text: &str, now_ms: i64) -> Result<GameState, PersistenceError> {
    let raw: RawSnapshot = serde_json::from_str(text)?;
    let level = match raw.level {
        Some(l) if l.is_finite() => l.floor().clamp(1.0, 255.0) as u8,
        _ => 1,
    };
    let last_timestamp = match raw.last_timestamp {
        Some(t) if t.is_finite() => t as i64,
        _ => now_ms,
    };
    let upgrades = raw.upgrades.unwrap_or_default();
    let mut state = GameState {
        name: raw.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
        minerals: need_value(raw.minerals.or(raw.purity)),
        hydration: need_value(raw.hydration),
        happiness: need_value(raw.happiness),
        sleep: need_value(raw.sleep.or(raw.social)),
        xp: 0.0,
        level: 1,
        evolution: 1,
        last_timestamp,
        dewdrops: non_negative(raw.dewdrops),
        is_sleeping: raw.is_sleeping.unwrap_or(false),
        inventory: raw.inventory.unwrap_or_default().into_iter().collect(),
        equipped: raw.equipped.unwrap_or_default(),
        upgrades: Upgrades {
            click_power: counter(upgrades.click_power),
            auto_gather: counter(upgrades.auto_gather),
            resilience: counter(upgrades.resilience),
        },
    };
    state.set_progress(normalize(non_negative(raw.xp), level));
    debug!(level = state.level, "decoded snapshot");
    Ok(state)
}

/// In-memory gateway. Clones share the same slot, so tests can keep a handle
/// and inspect what was written.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemorySlot>>,
}

#[derive(Debug, Default)]
struct MemorySlot {
    payload: Option<String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a payload.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        let store = Self::new();
        store.slot().payload = Some(payload.into());
        store
    }

    /// Last written payload.
    pub fn payload(&self) -> Option<String> {
        self.slot().payload.clone()
    }

    /// Number of writes so far.
    pub fn writes(&self) -> usize {
        self.slot().writes
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, MemorySlot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PersistenceGateway for MemoryStore {
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.payload())
    }

    fn write(&mut self, payload: &str) -> Result<(), PersistenceError> {
        let mut slot = self.slot();
        slot.payload = Some(payload.to_string());
        slot.writes += 1;
        Ok(())
    }
}

/// Gateway backed by one JSON file, replaced atomically on every write.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<dir>/dropli_save.json`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(format!("{SAVE_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceGateway for JsonFileStore {
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, payload: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pet_core::{validate_state, Slot};
    use proptest::prelude::*;

    #[test]
    fn roundtrip_through_memory_store() {
        let mut store = MemoryStore::new();
        assert!(store.load(0).unwrap().is_none());
        let mut s = GameState::new("Gota", 1_000);
        s.dewdrops = 12.5;
        s.inventory.insert("cap".to_string());
        s.equipped.hat = Some("cap".to_string());
        store.save(&s).unwrap();
        assert_eq!(store.writes(), 1);
        assert_eq!(store.load(99).unwrap().unwrap(), s);
    }

    #[test]
    fn legacy_names_are_mapped() {
        let text = r#"{"name":"Old","purity":42,"social":7,"hydration":80,"happiness":90,
                       "xp":10,"level":3,"evolution":1,"lastTimestamp":500}"#;
        let s = decode_snapshot(text, 9_999).unwrap();
        assert_eq!(s.minerals, 42);
        assert_eq!(s.sleep, 7);
        assert_eq!(s.last_timestamp, 500);
        assert_eq!(s.dewdrops, 0.0);
        assert!(!s.is_sleeping);
        assert!(s.inventory.is_empty());
        assert_eq!(s.upgrades, Upgrades::default());
    }

    #[test]
    fn current_names_win_over_legacy() {
        let s = decode_snapshot(r#"{"minerals":10,"purity":90}"#, 0).unwrap();
        assert_eq!(s.minerals, 10);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s = decode_snapshot("{}", 1234).unwrap();
        assert_eq!(s.name, DEFAULT_NAME);
        assert_eq!(s.last_timestamp, 1234);
        assert_eq!(s.level, 1);
        assert_eq!(s.minerals, 100);
        validate_state(&s).unwrap();
    }

    #[test]
    fn partial_upgrades_and_extras() {
        let text = r#"{"upgrades":{"autoGather":2},"equipped":{"face":"glasses"},
                       "inventory":["glasses","glasses"],"theme":"dark"}"#;
        let s = decode_snapshot(text, 0).unwrap();
        assert_eq!(s.upgrades.auto_gather, 2);
        assert_eq!(s.upgrades.click_power, 0);
        assert_eq!(s.equipped.get(Slot::Face), Some("glasses"));
        assert_eq!(s.inventory.len(), 1);
    }

    #[test]
    fn out_of_range_values_are_repaired() {
        let text = r#"{"minerals":250,"hydration":-4,"level":3,"evolution":3,"xp":1000,"dewdrops":-8}"#;
        let s = decode_snapshot(text, 0).unwrap();
        assert_eq!(s.minerals, 100);
        assert_eq!(s.hydration, 0);
        assert_eq!(s.dewdrops, 0.0);
        // 1000 xp at level 3 folds into further levels; evolution follows.
        assert!(s.level > 3);
        validate_state(&s).unwrap();
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decode_snapshot("not json", 0),
            Err(PersistenceError::Malformed(_))
        ));
        assert!(decode_snapshot("[1,2]", 0).is_err());
        assert!(decode_snapshot(r#"{"minerals":"lots"}"#, 0).is_err());
    }

    #[test]
    fn json_file_store_overwrites_in_place() {
        let dir = std::env::temp_dir().join(format!("dropli-store-{}", std::process::id()));
        let mut store = JsonFileStore::in_dir(&dir);
        assert!(store.read().unwrap().is_none());
        let mut s = GameState::new("File", 1);
        store.save(&s).unwrap();
        s.dewdrops = 3.0;
        store.save(&s).unwrap();
        assert_eq!(store.load(0).unwrap().unwrap().dewdrops, 3.0);
        assert!(store.path().ends_with("dropli_save.json"));
        fs::remove_dir_all(&dir).unwrap();
    }

    proptest! {
        #[test]
        fn decoded_needs_stay_in_range(m in -500.0f64..500.0, h in -500.0f64..500.0, lvl in -5.0f64..40.0) {
            let text = format!(r#"{{"minerals":{m},"hydration":{h},"level":{lvl}}}"#);
            let s = decode_snapshot(&text, 0).unwrap();
            prop_assert!(validate_state(&s).is_ok());
        }
    }
}
