//! On-disk copies of loaded lists, so a screen can render the last known
//! page before the first network response arrives.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::item::ListItem;
use crate::loader::{CursorToken, Paginator};

const CURRENT_SCHEMA_VERSION: u32 = 1;
const MAX_SNAPSHOT_BYTES: usize = 20 * 1024 * 1024;
const MAX_SNAPSHOT_ITEMS: usize = 10_000;
const SNAPSHOT_MAGIC: &[u8; 4] = b"LSNP";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupted snapshot: {reason}")]
    Corrupted { reason: &'static str },

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityCheckFailed { expected: String, actual: String },

    #[error("schema version {found} is newer than supported {max}")]
    FutureSchema { found: u32, max: u32 },

    #[error("snapshot too large: {size} bytes, max {max}")]
    TooLarge { size: usize, max: usize },

    #[error("too many items: {count}, max {max}")]
    TooManyItems { count: usize, max: usize },
}

impl From<ciborium::de::Error<std::io::Error>> for SnapshotError {
    fn from(e: ciborium::de::Error<std::io::Error>) -> Self {
        SnapshotError::Serialization(e.to_string())
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for SnapshotError {
    fn from(e: ciborium::ser::Error<std::io::Error>) -> Self {
        SnapshotError::Serialization(e.to_string())
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct SnapshotEnvelope {
    magic: [u8; 4],
    schema_version: u32,
    checksum: [u8; 32],
    payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListSnapshot<T> {
    pub items: Vec<T>,
    pub cursor: Option<CursorToken>,
    pub has_more: bool,
    pub total_available: Option<usize>,
    pub saved_at_ms: u64,
}

impl<T> ListSnapshot<T>
where
    T: ListItem + Serialize + DeserializeOwned,
{
    /// Copies what the paginator currently holds.
    pub fn capture(paginator: &Paginator<T>, saved_at_ms: u64) -> Self {
        paginator.with_state(|state| Self {
            items: state.items().to_vec(),
            cursor: state.cursor().cloned(),
            has_more: state.has_more(),
            total_available: state.total_available(),
            saved_at_ms,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload)?;

        let envelope = SnapshotEnvelope {
            magic: *SNAPSHOT_MAGIC,
            schema_version: CURRENT_SCHEMA_VERSION,
            checksum: *blake3::hash(&payload).as_bytes(),
            payload,
        };

        let mut bytes = Vec::new();
        ciborium::into_writer(&envelope, &mut bytes)?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        if bytes.len() > MAX_SNAPSHOT_BYTES {
            return Err(SnapshotError::TooLarge {
                size: bytes.len(),
                max: MAX_SNAPSHOT_BYTES,
            });
        }

        let envelope: SnapshotEnvelope = ciborium::from_reader(bytes)?;

        if envelope.magic != *SNAPSHOT_MAGIC {
            return Err(SnapshotError::Corrupted {
                reason: "invalid magic bytes",
            });
        }

        if envelope.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(SnapshotError::FutureSchema {
                found: envelope.schema_version,
                max: CURRENT_SCHEMA_VERSION,
            });
        }

        let actual = blake3::hash(&envelope.payload);
        if actual.as_bytes() != &envelope.checksum {
            return Err(SnapshotError::IntegrityCheckFailed {
                expected: hex::encode(envelope.checksum),
                actual: hex::encode(actual.as_bytes()),
            });
        }

        let snapshot: Self = ciborium::from_reader(&envelope.payload[..])?;
        if snapshot.items.len() > MAX_SNAPSHOT_ITEMS {
            return Err(SnapshotError::TooManyItems {
                count: snapshot.items.len(),
                max: MAX_SNAPSHOT_ITEMS,
            });
        }
        Ok(snapshot)
    }

    /// Writes via a temp file and rename so a crash never leaves half a file.
    #[instrument(skip(self), fields(items = self.items.len()))]
    pub fn save_to_path(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = self.to_bytes()?;
        let tmp_path = path.with_extension("tmp");

        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;

        std::fs::rename(&tmp_path, path)?;

        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        debug!(bytes = bytes.len(), "snapshot written");
        Ok(())
    }

    /// `Ok(None)` when no snapshot has been written yet.
    pub fn load_from_path(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(path)?;
        if bytes.is_empty() {
            return Err(SnapshotError::Corrupted {
                reason: "empty file",
            });
        }

        Self::from_bytes(&bytes).map(Some)
    }
}

impl<T: ListItem> Paginator<T> {
    /// Seeds the list from a snapshot. A fetch in flight is discarded when it
    /// lands; the next `refresh` replaces the restored items.
    pub fn restore(&self, snapshot: ListSnapshot<T>) {
        info!(items = snapshot.items.len(), saved_at_ms = snapshot.saved_at_ms, "restoring list snapshot");
        self.write().seed(
            snapshot.items,
            snapshot.cursor,
            snapshot.has_more,
            snapshot.total_available,
        );
    }
}
