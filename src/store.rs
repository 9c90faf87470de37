//! Local persistent store: a string key-value seam plus a typed repository.
//!
//! Two keys are kept, both JSON-encoded:
//! - `chat-projects`: array of [`Project`]
//! - `current-project`: project id string, or `null`
//!
//! Every save is a full overwrite of the value under its key.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::ValueEnum;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::models::Project;

pub const PROJECTS_KEY: &str = "chat-projects";
pub const CURRENT_PROJECT_KEY: &str = "current-project";

/// Raw string storage under string keys.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bytes = value.len(), "wrote store file");
        Ok(())
    }
}

/// A single `kv` table in a SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SqliteStore { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Which backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Sqlite,
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::File => write!(f, "file"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Open `backend` rooted at `data_dir`.
pub fn open_store(backend: StoreBackend, data_dir: &Path) -> Result<Box<dyn KeyValueStore>> {
    Ok(match backend {
        StoreBackend::File => Box::new(FileStore::new(data_dir)),
        StoreBackend::Sqlite => Box::new(SqliteStore::open(&data_dir.join("chat.db"))?),
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    })
}

// ---------------------------------------------------------------------------
// Typed repository
// ---------------------------------------------------------------------------

/// Typed load/save of the project collection and the current selection.
pub struct ProjectRepository {
    store: Box<dyn KeyValueStore>,
}

impl ProjectRepository {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        ProjectRepository { store: Box::new(store) }
    }

    pub fn from_boxed(store: Box<dyn KeyValueStore>) -> Self {
        ProjectRepository { store }
    }

    /// A missing key loads as an empty collection.
    pub fn load_projects(&self) -> Result<Vec<Project>> {
        self.load_json::<Vec<Project>>(PROJECTS_KEY)
            .map(Option::unwrap_or_default)
    }

    pub fn save_projects(&mut self, projects: &[Project]) -> Result<()> {
        let json = serde_json::to_string(projects)?;
        self.store.set(PROJECTS_KEY, &json)
    }

    /// A missing key and a stored `null` both load as no selection.
    pub fn load_current(&self) -> Result<Option<String>> {
        self.load_json::<Option<String>>(CURRENT_PROJECT_KEY).map(Option::flatten)
    }

    pub fn save_current(&mut self, current: Option<&str>) -> Result<()> {
        let json = serde_json::to_string(&current)?;
        self.store.set(CURRENT_PROJECT_KEY, &json)
    }

    fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key)? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|source| ChatError::Corrupt {
                key: key.to_string(),
                source,
            }),
        }
    }
}
