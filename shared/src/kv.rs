//! Local key-value persistence for small device-side state.
//!
//! Edit-mode flags and other per-screen preferences go through the
//! [`KvStore`] trait so the shell can inject whatever storage it has.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;
pub const MAX_PREFIX_LENGTH: usize = 64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {message}")]
    Serialization { message: String, key: Option<String> },
}

impl KvError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, KvError::Storage(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    EditMode,
    Settings,
    Cache,
    Custom(String),
}

impl KeyNamespace {
    #[must_use]
    pub fn prefix(&self) -> &str {
        match self {
            KeyNamespace::EditMode => "editmode",
            KeyNamespace::Settings => "settings",
            KeyNamespace::Cache => "cache",
            KeyNamespace::Custom(s) => s.as_str(),
        }
    }

    pub fn custom(prefix: impl Into<String>) -> Result<Self, KvError> {
        let prefix = prefix.into();
        if prefix.is_empty() || prefix.len() > MAX_PREFIX_LENGTH {
            return Err(KvError::InvalidKey {
                key: prefix,
                reason: format!("custom namespace must be 1..={MAX_PREFIX_LENGTH} bytes"),
            });
        }
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(KvError::InvalidKey {
                key: prefix,
                reason: "custom namespace contains invalid characters".to_string(),
            });
        }
        Ok(KeyNamespace::Custom(prefix))
    }
}

/// Validated, namespaced key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    /// Storage form, `namespace:key`.
    #[must_use]
    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    #[must_use]
    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        let reason = if key.trim().is_empty() {
            Some("key cannot be empty")
        } else if key.len() > MAX_KEY_LENGTH {
            Some("key exceeds maximum length")
        } else if key.contains("..") {
            Some("key cannot contain path traversal sequences")
        } else if key.starts_with('/') || key.starts_with('\\') {
            Some("key cannot start with path separator")
        } else if key.chars().any(|c| c.is_control() && c != '\t') {
            Some("key contains invalid control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(KvError::InvalidKey {
                key: key.chars().take(50).collect(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Injected load/save pair for device-local state.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &KvKey) -> Result<Option<Vec<u8>>, KvError>;
    async fn set(&self, key: &KvKey, value: Vec<u8>) -> Result<(), KvError>;
    async fn remove(&self, key: &KvKey) -> Result<bool, KvError>;
}

/// JSON helpers over any [`KvStore`].
pub async fn get_json<T, S>(store: &S, key: &KvKey) -> Result<Option<T>, KvError>
where
    T: DeserializeOwned,
    S: KvStore + ?Sized,
{
    let Some(bytes) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| KvError::Serialization {
            message: e.to_string(),
            key: Some(key.raw()),
        })
}

pub async fn set_json<T, S>(store: &S, key: &KvKey, value: &T) -> Result<(), KvError>
where
    T: Serialize + Sync,
    S: KvStore + ?Sized,
{
    let data = serde_json::to_vec(value).map_err(|e| KvError::Serialization {
        message: e.to_string(),
        key: Some(key.raw()),
    })?;
    store.set(key, data).await
}

fn check_size(value: &[u8]) -> Result<(), KvError> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(KvError::ValueTooLarge {
            size: value.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(())
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &KvKey) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.entries.read().await.get(&key.raw()).cloned())
    }

    async fn set(&self, key: &KvKey, value: Vec<u8>) -> Result<(), KvError> {
        check_size(&value)?;
        self.entries.write().await.insert(key.raw(), value);
        Ok(())
    }

    async fn remove(&self, key: &KvKey) -> Result<bool, KvError> {
        Ok(self.entries.write().await.remove(&key.raw()).is_some())
    }
}

#[cfg(all(feature = "sqlite", not(target_arch = "wasm32")))]
pub use sqlite::SqliteKv;

#[cfg(all(feature = "sqlite", not(target_arch = "wasm32")))]
mod sqlite {
    use super::{check_size, KvError, KvKey, KvStore};
    use async_trait::async_trait;
    use rusqlite::{params, Connection, OptionalExtension};
    use std::path::Path;
    use std::sync::{Mutex, PoisonError};
    use tracing::{debug, instrument};

    /// SQLite-backed store. Calls are short and run inline on the caller.
    pub struct SqliteKv {
        conn: Mutex<Connection>,
    }

    fn storage_err(e: rusqlite::Error) -> KvError {
        KvError::Storage(e.to_string())
    }

    impl SqliteKv {
        #[instrument]
        pub fn open(path: &Path) -> Result<Self, KvError> {
            let conn = Connection::open(path).map_err(storage_err)?;
            Self::init(conn)
        }

        pub fn open_in_memory() -> Result<Self, KvError> {
            let conn = Connection::open_in_memory().map_err(storage_err)?;
            Self::init(conn)
        }

        fn init(conn: Connection) -> Result<Self, KvError> {
            conn.execute_batch(
                r"
                CREATE TABLE IF NOT EXISTS kv_entries (
                    key TEXT PRIMARY KEY,
                    value BLOB NOT NULL
                );
                ",
            )
            .map_err(storage_err)?;
            debug!("kv store ready");
            Ok(Self {
                conn: Mutex::new(conn),
            })
        }

        fn with_conn<R>(
            &self,
            f: impl FnOnce(&Connection) -> rusqlite::Result<R>,
        ) -> Result<R, KvError> {
            let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn).map_err(storage_err)
        }
    }

    #[async_trait]
    impl KvStore for SqliteKv {
        async fn get(&self, key: &KvKey) -> Result<Option<Vec<u8>>, KvError> {
            self.with_conn(|conn| {
                conn.query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1",
                    params![key.raw()],
                    |row| row.get(0),
                )
                .optional()
            })
        }

        async fn set(&self, key: &KvKey, value: Vec<u8>) -> Result<(), KvError> {
            check_size(&value)?;
            self.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key.raw(), value],
                )
                .map(|_| ())
            })
        }

        async fn remove(&self, key: &KvKey) -> Result<bool, KvError> {
            self.with_conn(|conn| {
                conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key.raw()])
                    .map(|n| n > 0)
            })
        }
    }
}
