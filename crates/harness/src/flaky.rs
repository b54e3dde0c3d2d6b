use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use findprice_core::{Collection, FieldValue, StorePath};
use findprice_storage::{Listener, StorageError, Store, Subscription};

/// A change that reached the wrapped store, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Write(StorePath),
    Delete(StorePath),
}

impl JournalEntry {
    pub fn path(&self) -> &StorePath {
        match self {
            JournalEntry::Write(path) | JournalEntry::Delete(path) => path,
        }
    }

    pub fn collection(&self) -> Option<Collection> {
        self.path().collection()
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing_writes: BTreeSet<Collection>,
    failing_deletes: BTreeSet<Collection>,
    journal: Vec<JournalEntry>,
}

/// Wraps a store so tests can make writes or deletes under a collection
/// fail, and can see exactly which changes went through.
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    faults: Arc<Mutex<Faults>>,
}

impl<S: Store> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn faults(&self) -> Result<MutexGuard<'_, Faults>, StorageError> {
        self.faults.lock().map_err(|_| StorageError::LockPoisoned)
    }

    pub fn fail_writes(&self, collection: Collection) -> Result<(), StorageError> {
        self.faults()?.failing_writes.insert(collection);
        Ok(())
    }

    pub fn fail_deletes(&self, collection: Collection) -> Result<(), StorageError> {
        self.faults()?.failing_deletes.insert(collection);
        Ok(())
    }

    /// Lets every operation through again. The journal is kept.
    pub fn heal(&self) -> Result<(), StorageError> {
        let mut faults = self.faults()?;
        faults.failing_writes.clear();
        faults.failing_deletes.clear();
        Ok(())
    }

    pub fn journal(&self) -> Result<Vec<JournalEntry>, StorageError> {
        Ok(self.faults()?.journal.clone())
    }

    pub fn clear_journal(&self) -> Result<(), StorageError> {
        self.faults()?.journal.clear();
        Ok(())
    }

    fn check(&self, path: &StorePath, deleting: bool) -> Result<(), StorageError> {
        let faults = self.faults()?;
        let armed = if deleting { &faults.failing_deletes } else { &faults.failing_writes };
        match path.collection() {
            Some(collection) if armed.contains(&collection) => Err(StorageError::Rejected {
                path: path.to_string(),
                reason: "injected failure".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn record(&self, entry: JournalEntry) -> Result<(), StorageError> {
        self.faults()?.journal.push(entry);
        Ok(())
    }
}

impl<S: Store> Store for FlakyStore<S> {
    fn subscribe(
        &self,
        path: &StorePath,
        listener: Listener,
    ) -> Result<Subscription, StorageError> {
        self.inner.subscribe(path, listener)
    }

    fn write_at(&self, path: &StorePath, value: &FieldValue) -> Result<(), StorageError> {
        self.check(path, value.is_null())?;
        self.inner.write_at(path, value)?;
        self.record(JournalEntry::Write(path.clone()))
    }

    fn generate_key(&self, parent: &StorePath) -> Result<StorePath, StorageError> {
        self.inner.generate_key(parent)
    }

    fn delete_at(&self, path: &StorePath) -> Result<(), StorageError> {
        self.check(path, true)?;
        self.inner.delete_at(path)?;
        self.record(JournalEntry::Delete(path.clone()))
    }
}
