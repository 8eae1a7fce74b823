//! Durable snapshot of the dashboard state.
//!
//! The snapshot is a single named blob holding the whole [`AppState`], wrapped
//! in a versioned envelope:
//!
//! ```json
//! { "state": { "polygons": { ... }, "timeRange": [start, end] }, "version": 0 }
//! ```
//!
//! It is restored once at startup and overwritten after every mutation.

use common::STORAGE_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

use crate::entities::app_state::AppState;
use crate::error::{Result, StorageError};

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 0;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    state: &'a AppState,
    version: u32,
}

#[derive(Deserialize)]
struct Snapshot {
    state: AppState,
    #[serde(default)]
    version: u32,
}

/// Encodes `state` as a snapshot blob.
pub fn encode_snapshot(state: &AppState) -> Result<String> {
    Ok(serde_json::to_string_pretty(&SnapshotRef {
        state,
        version: SNAPSHOT_VERSION,
    })?)
}

/// Decodes a snapshot blob written by [`encode_snapshot`].
pub fn decode_snapshot(blob: &str) -> Result<AppState> {
    let snapshot: Snapshot = serde_json::from_str(blob)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(StorageError::Version {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    Ok(snapshot.state)
}

/// Where the dashboard state lives between sessions.
pub trait StateStorage: Send {
    /// Returns the stored state, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<AppState>>;

    /// Replaces the stored state.
    fn save(&self, state: &AppState) -> Result<()>;
}

/// Stores the snapshot as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage at `<dir>/geo-dashboard-storage-v2.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", STORAGE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<AppState>> {
        if !self.path.exists() {
            debug!("No snapshot at {}", self.path.display());
            return Ok(None);
        }
        let blob = fs::read_to_string(&self.path)?;
        let state = decode_snapshot(&blob)?;
        debug!(
            "Restored {} regions from {}",
            state.polygons.len(),
            self.path.display()
        );
        Ok(Some(state))
    }

    fn save(&self, state: &AppState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let blob = encode_snapshot(state)?;

        // Write next to the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, blob)?;
        fs::rename(&tmp, &self.path)?;
        trace!("Snapshot written to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the snapshot blob in memory. Clones share the same blob, so a test
/// can hand one clone to the store and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blob: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with `state`.
    pub fn with_state(state: &AppState) -> Result<Self> {
        let storage = Self::new();
        storage.save(state)?;
        Ok(storage)
    }

    /// The raw blob, if anything was saved.
    pub fn blob(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|b| b.clone())
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<AppState>> {
        let blob = self
            .blob
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        blob.as_deref().map(decode_snapshot).transpose()
    }

    fn save(&self, state: &AppState) -> Result<()> {
        let encoded = encode_snapshot(state)?;
        let mut blob = self
            .blob
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        *blob = Some(encoded);
        Ok(())
    }
}
