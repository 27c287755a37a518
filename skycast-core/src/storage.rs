//! Local persistence: a string key-value port and the two JSON blobs kept in it.

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    error::{Error, Result},
    model::{ResolvedLocation, TrackedCity},
};

pub const CITIES_KEY: &str = "cities";
pub const LOCATION_KEY: &str = "user_location";

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store. Counts writes so callers can tell whether anything
/// was persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::persistence(format!("Failed to read {}: {e}", path.display()))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        write_atomic(&path, value.as_bytes())
            .map_err(|e| Error::persistence(format!("Failed to write {}: {e}", path.display())))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(format!("Failed to remove {}: {e}", path.display()))),
        }
    }
}

// Readers never observe a half-written file.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "store path must have a parent directory")
    })?;
    fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Typed access to the tracked-city list and the resolved location.
///
/// Reads never fail: missing or corrupt data yields the empty default and a
/// warning in the log.
#[derive(Debug, Clone)]
pub struct Persistence {
    kv: Arc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn load_cities(&self) -> Vec<TrackedCity> {
        self.load(CITIES_KEY).unwrap_or_default()
    }

    /// Writes the full list; each call is a complete snapshot.
    pub fn save_cities(&self, cities: &[TrackedCity]) -> Result<()> {
        self.save(CITIES_KEY, cities)
    }

    pub fn load_location(&self) -> Option<ResolvedLocation> {
        self.load(LOCATION_KEY)
    }

    pub fn save_location(&self, location: &ResolvedLocation) -> Result<()> {
        self.save(LOCATION_KEY, location)
    }

    pub fn clear_location(&self) -> Result<()> {
        self.kv.remove(LOCATION_KEY)
    }

    fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "could not read persisted value");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding corrupt persisted value");
                None
            }
        }
    }

    fn save<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| Error::persistence(format!("Failed to serialize {key}: {e}")))?;
        self.kv.set(key, &json)
    }
}
