use std::fmt;

use findprice_core::{FieldValue, StorePath};

use crate::error::StorageError;

/// The value at a path at one moment. `value` is `Null` when nothing is
/// stored there.
///
/// `sequence` orders snapshots across the whole store: a snapshot taken after
/// a later change carries a larger number. Deliveries triggered from several
/// threads can arrive out of order, so a listener keeping state should drop
/// any snapshot older than the last one it applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: StorePath,
    pub value: FieldValue,
    pub sequence: u64,
}

/// Receives every snapshot pushed for a subscribed path. Must not call back
/// into the store that invokes it.
pub type Listener = Box<dyn FnMut(&Snapshot) + Send + 'static>;

/// Handle for a standing subscription. Dropping it, or calling
/// [`Subscription::cancel`], unregisters the listener; no snapshot is
/// delivered afterwards.
pub struct Subscription {
    path: StorePath,
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    pub fn new(path: StorePath, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            path,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Capabilities the catalog needs from a hierarchical realtime store.
///
/// Documents live one level below a collection (`products/<key>`).
/// Subscriptions may target either a collection or a single document.
pub trait Store {
    /// Registers `listener` for `path` and delivers the current value
    /// immediately, then again after every change at or below `path`.
    fn subscribe(&self, path: &StorePath, listener: Listener)
    -> Result<Subscription, StorageError>;

    /// Replaces the whole document at `path`. Writing `Null` removes it.
    fn write_at(&self, path: &StorePath, value: &FieldValue) -> Result<(), StorageError>;

    /// A fresh, never-used document path under the collection `parent`.
    fn generate_key(&self, parent: &StorePath) -> Result<StorePath, StorageError>;

    /// Removes the document at `path`. Removing nothing is not an error.
    fn delete_at(&self, path: &StorePath) -> Result<(), StorageError>;
}

pub(crate) fn require_document(path: &StorePath) -> Result<(), StorageError> {
    if path.is_document() {
        Ok(())
    } else {
        Err(StorageError::InvalidPath {
            path: path.to_string(),
            reason: "expected a document path",
        })
    }
}

pub(crate) fn require_collection(path: &StorePath) -> Result<(), StorageError> {
    if path.is_collection() {
        Ok(())
    } else {
        Err(StorageError::InvalidPath {
            path: path.to_string(),
            reason: "expected a collection path",
        })
    }
}
