use crate::Entry;
use dirs_next as dirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Millisecond timestamp identifying an entry.
pub type Key = i64;

const SCHEMA_VERSION: u32 = 1;
const FILE: &str = "waight_entries.json";
const DATA_FILE_ENV: &str = "WAIGHT_DATA_FILE";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("the entry store is not ready")]
    NotReady,
    #[error("entry store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("entry store file is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entry store version {0} is newer than this build understands")]
    UnsupportedVersion(u32),
}

/// Storage for weight entries keyed by their timestamp in milliseconds.
///
/// Two entries recorded in the same millisecond share a key, so adding the
/// second one replaces the first.
pub trait EntryStore {
    /// Snapshot of every entry in ascending timestamp order.
    fn get_all(&self) -> Result<Vec<Entry>, StoreError>;
    fn add(&mut self, entry: Entry) -> Result<(), StoreError>;
    fn delete(&mut self, key: Key) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Store kept entirely in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Key, Entry>,
}

#[cfg(test)]
impl EntryStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self.entries.values().cloned().collect())
    }

    fn add(&mut self, entry: Entry) -> Result<(), StoreError> {
        self.entries.insert(entry.key(), entry);
        Ok(())
    }

    fn delete(&mut self, key: Key) -> Result<(), StoreError> {
        self.entries.remove(&key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    version: u32,
    entries: &'a BTreeMap<Key, Entry>,
}

#[derive(Deserialize)]
struct StoreFile {
    #[serde(default)]
    entries: BTreeMap<Key, Entry>,
}

/// Entry store persisted as a JSON document.
///
/// The whole map is rewritten after every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<Key, Entry>,
}

impl JsonFileStore {
    /// Open the store at `path`, upgrading older layouts in place.
    ///
    /// A missing file is an empty store; nothing is written until the first
    /// mutation.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            log::info!("No entry store at {}, starting empty", path.display());
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }

        let data = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&data)?;
        // Version 0 was a bare list of entries.
        let store = if value.is_array() {
            log::info!(
                "Upgrading entry store {} to version {SCHEMA_VERSION}",
                path.display()
            );
            let list: Vec<Entry> = serde_json::from_value(value)?;
            let store = Self {
                path,
                entries: list.into_iter().map(|e| (e.key(), e)).collect(),
            };
            store.write(&store.entries)?;
            store
        } else {
            let version = value
                .get("version")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            if version > u64::from(SCHEMA_VERSION) {
                return Err(StoreError::UnsupportedVersion(
                    u32::try_from(version).unwrap_or(u32::MAX),
                ));
            }
            let file: StoreFile = serde_json::from_str(&data)?;
            Self {
                path,
                entries: file.entries,
            }
        };
        log::info!(
            "Opened entry store {} with {} entries",
            store.path.display(),
            store.entries.len()
        );
        Ok(store)
    }

    /// Write `entries` to disk. Callers swap them in only once this succeeds.
    fn write(&self, entries: &BTreeMap<Key, Entry>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StoreFileRef {
            version: SCHEMA_VERSION,
            entries,
        };
        let data = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

impl EntryStore for JsonFileStore {
    fn get_all(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self.entries.values().cloned().collect())
    }

    fn add(&mut self, entry: Entry) -> Result<(), StoreError> {
        let key = entry.key();
        let mut entries = self.entries.clone();
        if entries.insert(key, entry).is_some() {
            log::warn!("Entry {key} replaced an entry recorded in the same millisecond");
        }
        self.write(&entries)?;
        self.entries = entries;
        Ok(())
    }

    fn delete(&mut self, key: Key) -> Result<(), StoreError> {
        if !self.entries.contains_key(&key) {
            log::warn!("No entry with key {key} to delete");
            return Ok(());
        }
        let mut entries = self.entries.clone();
        entries.remove(&key);
        self.write(&entries)?;
        self.entries = entries;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.write(&BTreeMap::new())?;
        self.entries.clear();
        Ok(())
    }
}

/// Determine where the entry store lives.
///
/// The `WAIGHT_DATA_FILE` environment variable takes precedence over the
/// path from the settings, which in turn overrides the default file in the
/// config directory.
pub fn resolve_data_file(settings_path: Option<&str>) -> Option<PathBuf> {
    std::env::var_os(DATA_FILE_ENV)
        .map(PathBuf::from)
        .or_else(|| settings_path.map(PathBuf::from))
        .or_else(|| dirs::config_dir().map(|p| p.join(FILE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ENV_MUTEX;
    use chrono::{Local, TimeZone};

    fn entry(day: u32, hour: u32, weight: f64) -> Entry {
        Entry::new(
            weight,
            Local.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap(),
        )
    }

    fn exercise_store(store: &mut dyn EntryStore) {
        store.add(entry(3, 9, 79.0)).unwrap();
        store.add(entry(1, 9, 80.0)).unwrap();
        store.add(entry(2, 9, 79.5)).unwrap();

        let all = store.get_all().unwrap();
        let weights: Vec<f64> = all.iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![80.0, 79.5, 79.0]);

        store.delete(entry(2, 9, 0.0).key()).unwrap();
        let weights: Vec<f64> = store.get_all().unwrap().iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![80.0, 79.0]);

        store.clear().unwrap();
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn memory_store_operations() {
        let mut store = MemoryStore::default();
        exercise_store(&mut store);
    }

    #[test]
    fn file_store_operations() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("entries.json")).unwrap();
        exercise_store(&mut store);
    }

    #[test]
    fn same_millisecond_overwrites() {
        let mut store = MemoryStore::default();
        store.add(entry(4, 7, 81.0)).unwrap();
        store.add(entry(4, 7, 80.2)).unwrap();
        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].weight, 80.2);
    }

    #[test]
    fn file_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("entries.json");
        {
            let mut store = JsonFileStore::open(&path).unwrap();
            assert!(store.get_all().unwrap().is_empty());
            assert!(!path.exists());
            store.add(entry(10, 8, 77.7)).unwrap();
            store.add(entry(11, 8, 77.1)).unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        let all = store.get_all().unwrap();
        assert_eq!(all, vec![entry(10, 8, 77.7), entry(11, 8, 77.1)]);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        let key = entry(10, 8, 0.0).key().to_string();
        assert_eq!(raw["entries"][key.as_str()]["weight"], 77.7);
    }

    #[test]
    fn legacy_list_is_upgraded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        let legacy = vec![entry(2, 6, 82.0), entry(1, 6, 82.4)];
        std::fs::write(&path, serde_json::to_string(&legacy).unwrap()).unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            store.get_all().unwrap(),
            vec![entry(1, 6, 82.4), entry(2, 6, 82.0)]
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_all().unwrap(), store.get_all().unwrap());
    }

    #[test]
    fn failed_write_leaves_entries_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let mut store = JsonFileStore::open(blocker.join("entries.json")).unwrap();

        assert!(matches!(store.add(entry(6, 8, 80.0)), Err(StoreError::Io(_))));
        assert!(store.get_all().unwrap().is_empty());

        store.entries.insert(entry(7, 8, 79.0).key(), entry(7, 8, 79.0));
        assert!(store.clear().is_err());
        assert!(store.delete(entry(7, 8, 0.0).key()).is_err());
        assert_eq!(store.get_all().unwrap(), vec![entry(7, 8, 79.0)]);
    }

    #[test]
    fn newer_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        std::fs::write(&path, r#"{"version": 7, "entries": {}}"#).unwrap();
        match JsonFileStore::open(&path) {
            Err(StoreError::UnsupportedVersion(7)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn env_var_overrides_settings_path() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe {
            std::env::set_var(DATA_FILE_ENV, "/tmp/forced.json");
        }
        let path = resolve_data_file(Some("/tmp/from_settings.json"));
        assert_eq!(path, Some(PathBuf::from("/tmp/forced.json")));

        unsafe {
            std::env::remove_var(DATA_FILE_ENV);
        }
        let path = resolve_data_file(Some("/tmp/from_settings.json"));
        assert_eq!(path, Some(PathBuf::from("/tmp/from_settings.json")));
    }
}
