use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use findprice_core::{FieldValue, Key, StorePath};

use crate::error::StorageError;
use crate::traits::{Listener, Snapshot, Store, Subscription, require_collection, require_document};

struct Registration {
    path: StorePath,
    active: Arc<AtomicBool>,
    listener: Arc<Mutex<Listener>>,
}

struct Inner {
    conn: Connection,
    registrations: BTreeMap<u64, Registration>,
    next_registration: u64,
    /// Bumped under the lock by every committed change.
    sequence: u64,
}

/// A pending delivery, collected under the store lock and run after it is
/// released so listeners never execute while the store is locked.
struct Delivery {
    active: Arc<AtomicBool>,
    listener: Arc<Mutex<Listener>>,
    snapshot: Snapshot,
}

impl Delivery {
    fn run(self) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        match self.listener.lock() {
            Ok(mut listener) => (*listener)(&self.snapshot),
            Err(_) => warn!(path = %self.snapshot.path, "listener lock poisoned, snapshot dropped"),
        }
    }
}

/// Realtime document store on SQLite. Cloning yields another handle to the
/// same store, so several clients can share it and observe each other's
/// writes through their subscriptions.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<Mutex<Inner>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                conn,
                registrations: BTreeMap::new(),
                next_registration: 0,
                sequence: 0,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Reads the current value at a collection or document path.
    pub fn value_at(&self, path: &StorePath) -> Result<FieldValue, StorageError> {
        let inner = self.lock()?;
        read_value(&inner.conn, path)
    }

    /// Number of live subscriptions, across all handles.
    pub fn subscription_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.registrations.len())
    }

    /// Commits `mutate`, then notifies subscribers. Once the change is
    /// committed the call succeeds; a watched path that cannot be re-read is
    /// logged and its subscribers miss this one update.
    fn apply<F>(&self, path: &StorePath, mutate: F) -> Result<(), StorageError>
    where
        F: FnOnce(&Connection) -> Result<(), StorageError>,
    {
        require_document(path)?;
        let deliveries = {
            let mut inner = self.lock()?;
            mutate(&inner.conn)?;
            inner.sequence += 1;
            collect_deliveries(&inner, path)
        };
        for delivery in deliveries {
            delivery.run();
        }
        Ok(())
    }
}

impl Store for SqliteStore {
    fn subscribe(
        &self,
        path: &StorePath,
        listener: Listener,
    ) -> Result<Subscription, StorageError> {
        if path.depth() > 2 {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                reason: "subscriptions target a collection or a document",
            });
        }
        let active = Arc::new(AtomicBool::new(true));
        let listener = Arc::new(Mutex::new(listener));
        let (id, initial) = {
            let mut inner = self.lock()?;
            let value = match read_value(&inner.conn, path) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(%path, error = %e, "initial read failed, first snapshot skipped");
                    None
                }
            };
            let snapshot = value.map(|value| Snapshot {
                path: path.clone(),
                value,
                sequence: inner.sequence,
            });
            let id = inner.next_registration;
            inner.next_registration += 1;
            inner.registrations.insert(
                id,
                Registration {
                    path: path.clone(),
                    active: Arc::clone(&active),
                    listener: Arc::clone(&listener),
                },
            );
            (id, snapshot)
        };
        debug!(%path, id, "subscribed");

        if let Some(snapshot) = initial {
            Delivery {
                active: Arc::clone(&active),
                listener,
                snapshot,
            }
            .run();
        }

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let cancelled_path = path.clone();
        Ok(Subscription::new(path.clone(), move || {
            active.store(false, Ordering::SeqCst);
            if let Some(shared) = weak.upgrade() {
                if let Ok(mut inner) = shared.lock() {
                    inner.registrations.remove(&id);
                }
            }
            debug!(path = %cancelled_path, id, "unsubscribed");
        }))
    }

    fn write_at(&self, path: &StorePath, value: &FieldValue) -> Result<(), StorageError> {
        if value.is_null() {
            return self.delete_at(path);
        }
        let (parent, key) = split_document(path)?;
        let bytes = value
            .to_msgpack()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.apply(path, |conn| {
            conn.execute(
                "INSERT INTO documents (parent, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (parent, key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
                rusqlite::params![parent, key, bytes],
            )?;
            Ok(())
        })?;
        debug!(%path, "document written");
        Ok(())
    }

    fn generate_key(&self, parent: &StorePath) -> Result<StorePath, StorageError> {
        require_collection(parent)?;
        Ok(parent.child(&Key::generate()))
    }

    fn delete_at(&self, path: &StorePath) -> Result<(), StorageError> {
        let (parent, key) = split_document(path)?;
        self.apply(path, |conn| {
            conn.execute(
                "DELETE FROM documents WHERE parent = ?1 AND key = ?2",
                rusqlite::params![parent, key],
            )?;
            Ok(())
        })?;
        debug!(%path, "document deleted");
        Ok(())
    }
}

fn split_document(path: &StorePath) -> Result<(String, String), StorageError> {
    require_document(path)?;
    let segments = path.segments();
    Ok((segments[0].clone(), segments[1].clone()))
}

fn decode(path: &str, bytes: &[u8]) -> Result<FieldValue, StorageError> {
    FieldValue::from_msgpack(bytes)
        .map_err(|e| StorageError::Serialization(format!("{path}: {e}")))
}

fn read_value(conn: &Connection, path: &StorePath) -> Result<FieldValue, StorageError> {
    if path.is_collection() {
        let parent = path.to_string();
        let mut stmt = conn.prepare("SELECT key, value FROM documents WHERE parent = ?1")?;
        let rows: Vec<(String, Vec<u8>)> = stmt
            .query_map(rusqlite::params![parent], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if rows.is_empty() {
            return Ok(FieldValue::Null);
        }
        let mut children = BTreeMap::new();
        for (key, bytes) in rows {
            match decode(&format!("{parent}/{key}"), &bytes) {
                Ok(value) => {
                    children.insert(key, value);
                }
                Err(e) => warn!(error = %e, "skipping undecodable document"),
            }
        }
        if children.is_empty() {
            return Ok(FieldValue::Null);
        }
        return Ok(FieldValue::Map(children));
    }

    let (parent, key) = split_document(path)?;
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT value FROM documents WHERE parent = ?1 AND key = ?2",
            rusqlite::params![parent, key],
            |row| row.get(0),
        )
        .optional()?;
    match bytes {
        Some(bytes) => decode(&path.to_string(), &bytes),
        None => Ok(FieldValue::Null),
    }
}

/// Snapshots for every registration watching the written document or its
/// collection, stamped with the current sequence. Each watched path is read
/// once; one that fails to read is skipped.
fn collect_deliveries(inner: &Inner, written: &StorePath) -> Vec<Delivery> {
    let parent = written.parent();
    let mut values: BTreeMap<StorePath, Option<FieldValue>> = BTreeMap::new();
    let mut deliveries = Vec::new();
    for registration in inner.registrations.values() {
        let watched = &registration.path;
        if watched != written && Some(watched) != parent.as_ref() {
            continue;
        }
        let value = values
            .entry(watched.clone())
            .or_insert_with(|| match read_value(&inner.conn, watched) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(path = %watched, error = %e, "re-read failed, update not delivered");
                    None
                }
            });
        let Some(value) = value else {
            continue;
        };
        deliveries.push(Delivery {
            active: Arc::clone(&registration.active),
            listener: Arc::clone(&registration.listener),
            snapshot: Snapshot {
                path: watched.clone(),
                value: value.clone(),
                sequence: inner.sequence,
            },
        });
    }
    deliveries
}
