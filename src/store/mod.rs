//! # Datastore
//!
//! A façade over a file-backed object store: one JSON file per record
//! kind under a store directory. Reads open a fresh connection on the
//! caller's context; writes are funneled through a single dedicated
//! writer thread, so at most one write transaction is in flight per
//! store. Commits replace kind files atomically (write `.tmp`, then
//! `rename()`), which means readers only ever observe committed state.
//!
//! Objects read on one context are never dereferenced inside the write
//! queue directly; they cross over as [`ObjectHandle`]s, resolved back
//! to live copies inside the transaction.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread;

use chrono::Utc;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::completion::Completion;

mod handle;

pub use handle::ObjectHandle;

/// A persistable object kind: serde-codable, cloneable, with a stable
/// identity and a kind name that doubles as its file stem.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Encode(serde_json::Error),
    Decode(serde_json::Error),
    /// The writer queue is gone; no further writes will run.
    Closed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store I/O error: {e}"),
            StoreError::Encode(e) => write!(f, "store encode error: {e}"),
            StoreError::Decode(e) => write!(f, "store decode error: {e}"),
            StoreError::Closed => write!(f, "store write queue is closed"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Where a store keeps its kind files.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    dir: PathBuf,
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default location, `~/.rudder/store`.
    pub fn standard() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(".rudder").join("store")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Stored records are wrapped so identity survives without dictating the
/// record's own field layout.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    id: Uuid,
    value: serde_json::Value,
}

/// On-disk shape of one kind file.
#[derive(Serialize, Deserialize, Default)]
struct KindFile {
    saved_at: i64,
    records: Vec<StoredRecord>,
}

/// A connection scoped to one context: plain whole-file reads of kind
/// files. A missing file is an empty kind.
struct Connection {
    dir: PathBuf,
}

impl Connection {
    fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.dir)?;
        Ok(Self {
            dir: config.dir.clone(),
        })
    }

    fn kind_path(&self, kind: &str) -> PathBuf {
        self.dir.join(format!("{kind}.json"))
    }

    fn load_kind(&self, kind: &str) -> Result<KindFile, StoreError> {
        let path = self.kind_path(kind);
        if !path.exists() {
            return Ok(KindFile::default());
        }
        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json).map_err(StoreError::Decode)
    }

    fn read_all<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        let file = self.load_kind(T::KIND)?;
        file.records
            .into_iter()
            .map(|record| serde_json::from_value(record.value).map_err(StoreError::Decode))
            .collect()
    }

    fn contains<T: Record>(&self, id: Uuid) -> Result<bool, StoreError> {
        let file = self.load_kind(T::KIND)?;
        Ok(file.records.iter().any(|record| record.id == id))
    }
}

/// A write transaction: kind files staged in memory, committed atomically
/// per kind. Only ever constructed on the writer thread.
pub struct Transaction<'a> {
    conn: &'a Connection,
    staged: HashMap<&'static str, KindFile>,
}

impl<'a> Transaction<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            staged: HashMap::new(),
        }
    }

    fn kind_mut(&mut self, kind: &'static str) -> Result<&mut KindFile, StoreError> {
        match self.staged.entry(kind) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(self.conn.load_kind(kind)?)),
        }
    }

    /// All records of a kind as seen by this transaction, staged
    /// mutations included.
    pub fn all<T: Record>(&mut self) -> Result<Vec<T>, StoreError> {
        self.kind_mut(T::KIND)?
            .records
            .iter()
            .map(|record| serde_json::from_value(record.value.clone()).map_err(StoreError::Decode))
            .collect()
    }

    /// Look up one record by id.
    pub fn get<T: Record>(&mut self, id: Uuid) -> Result<Option<T>, StoreError> {
        let file = self.kind_mut(T::KIND)?;
        match file.records.iter().find(|record| record.id == id) {
            Some(record) => serde_json::from_value(record.value.clone())
                .map(Some)
                .map_err(StoreError::Decode),
            None => Ok(None),
        }
    }

    /// Insert or replace a record, keyed by its id.
    pub fn put<T: Record>(&mut self, object: &T) -> Result<(), StoreError> {
        let id = object.id();
        let value = serde_json::to_value(object).map_err(StoreError::Encode)?;
        let file = self.kind_mut(T::KIND)?;
        match file.records.iter_mut().find(|record| record.id == id) {
            Some(record) => record.value = value,
            None => file.records.push(StoredRecord { id, value }),
        }
        Ok(())
    }

    /// Remove a record by id. Returns whether anything was removed.
    pub fn delete<T: Record>(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let file = self.kind_mut(T::KIND)?;
        let before = file.records.len();
        file.records.retain(|record| record.id != id);
        Ok(file.records.len() != before)
    }

    fn commit(self) -> Result<(), StoreError> {
        let now = Utc::now().timestamp();
        for (kind, mut file) in self.staged {
            file.saved_at = now;
            atomic_write_json(&self.conn.kind_path(kind), &file)?;
        }
        Ok(())
    }
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data).map_err(StoreError::Encode)?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

type WriteJob = Box<dyn FnOnce() + Send>;

/// The store façade. Reads open fresh connections anywhere; writes run
/// one at a time on the dedicated writer thread.
pub struct Datastore {
    config: StoreConfig,
    jobs: mpsc::Sender<WriteJob>,
    version_tx: Arc<watch::Sender<u64>>,
    version_rx: watch::Receiver<u64>,
}

impl Datastore {
    pub fn open(config: StoreConfig) -> Datastore {
        info!("open {}", config.dir().display());
        let (jobs, queue) = mpsc::channel::<WriteJob>();
        let spawned = thread::Builder::new()
            .name("rudder-store-writer".to_string())
            .spawn(move || {
                while let Ok(job) = queue.recv() {
                    job();
                }
            });
        if let Err(e) = spawned {
            // The queue receiver is gone, so writes will surface Closed.
            warn!("failed to spawn store writer: {e}");
        }
        let (version_tx, version_rx) = watch::channel(0u64);
        Datastore {
            config,
            jobs,
            version_tx: Arc::new(version_tx),
            version_rx,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A live, auto-updating view of all records of a kind, read through
    /// a connection scoped to the calling context.
    pub fn read_all<T: Record>(&self) -> Result<LiveResults<T>, StoreError> {
        let conn = Connection::open(&self.config)?;
        let items = conn.read_all()?;
        Ok(LiveResults {
            config: self.config.clone(),
            version: self.version_rx.clone(),
            items,
        })
    }

    /// Run `mutator` inside a write transaction on the dedicated queue.
    /// The returned completion fires with the transaction's outcome.
    pub fn write<F>(&self, mutator: F) -> Completion<StoreError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), StoreError> + Send + 'static,
    {
        let (source, completion) = Completion::pending();
        let config = self.config.clone();
        let version = self.version_tx.clone();
        let job: WriteJob = Box::new(move || {
            let result = run_transaction(&config, mutator);
            if result.is_ok() {
                version.send_modify(|v| *v += 1);
            }
            source.resolve(result);
        });
        if self.jobs.send(job).is_err() {
            return Completion::resolved(Err(StoreError::Closed));
        }
        completion
    }

    /// Write against a single object read elsewhere: a thread-safe handle
    /// is captured here, then resolved to a live copy inside the
    /// transaction. The mutator sees `None` if the record has since been
    /// deleted; a never-persisted object is passed through as captured.
    pub fn write_object<T, F>(&self, object: &T, mutator: F) -> Completion<StoreError>
    where
        T: Record + Send + 'static,
        F: FnOnce(&mut Transaction, Option<T>) -> Result<(), StoreError> + Send + 'static,
    {
        let handle = ObjectHandle::capture(self, object);
        self.write(move |txn| {
            let live = handle.resolve(txn)?;
            mutator(txn, live)
        })
    }

    /// Like [`Datastore::write_object`] for a batch; records that no
    /// longer resolve are dropped from the slice the mutator sees.
    pub fn write_objects<T, F>(&self, objects: &[T], mutator: F) -> Completion<StoreError>
    where
        T: Record + Send + 'static,
        F: FnOnce(&mut Transaction, Vec<T>) -> Result<(), StoreError> + Send + 'static,
    {
        let handles: Vec<ObjectHandle<T>> = objects
            .iter()
            .map(|object| ObjectHandle::capture(self, object))
            .collect();
        self.write(move |txn| {
            let mut live = Vec::with_capacity(handles.len());
            for handle in handles {
                if let Some(object) = handle.resolve(txn)? {
                    live.push(object);
                }
            }
            mutator(txn, live)
        })
    }

    /// Whether an object's record currently exists on disk. Handle
    /// capture uses this; read failures count as not persisted.
    fn is_persisted<T: Record>(&self, object: &T) -> bool {
        let check = Connection::open(&self.config).and_then(|conn| conn.contains::<T>(object.id()));
        match check {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("handle capture could not read {}: {e}", T::KIND);
                false
            }
        }
    }
}

fn run_transaction<F>(config: &StoreConfig, mutator: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut Transaction) -> Result<(), StoreError>,
{
    let conn = Connection::open(config)?;
    let mut txn = Transaction::new(&conn);
    mutator(&mut txn)?;
    txn.commit()
}

/// A live result set: a committed snapshot that refreshes itself when the
/// store's version advances (i.e. after each commit).
pub struct LiveResults<T: Record> {
    config: StoreConfig,
    version: watch::Receiver<u64>,
    items: Vec<T>,
}

impl<T: Record> LiveResults<T> {
    /// The current records, refreshed if a commit has landed since the
    /// last look. A failed refresh keeps the previous snapshot.
    pub fn items(&mut self) -> &[T] {
        if self.version.has_changed().unwrap_or(false) {
            self.refresh();
        }
        &self.items
    }

    pub fn len(&mut self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.items().is_empty()
    }

    /// Wait for the next commit to land, then refresh. Returns the fresh
    /// snapshot.
    pub async fn changed(&mut self) -> &[T] {
        if self.version.changed().await.is_ok() {
            self.refresh();
        }
        &self.items
    }

    fn refresh(&mut self) {
        self.version.mark_unchanged();
        let loaded = Connection::open(&self.config).and_then(|conn| conn.read_all::<T>());
        match loaded {
            Ok(items) => self.items = items,
            Err(e) => warn!("live results refresh failed for {}: {e}", T::KIND),
        }
    }
}
