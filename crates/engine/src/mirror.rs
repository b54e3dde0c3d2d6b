use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use findprice_core::{Document, FieldValue, Key};
use findprice_storage::{Snapshot, Store, Subscription};

use crate::error::EngineError;

/// Turns the value pushed for a collection into entities, the key injected
/// as each entity's id. Nothing stored means an empty list. Entries that do
/// not decode are logged and left out.
pub fn decode_snapshot<T: Document>(snapshot: &Snapshot) -> Vec<T> {
    let children = match &snapshot.value {
        FieldValue::Null => return Vec::new(),
        FieldValue::Map(children) => children,
        other => {
            warn!(path = %snapshot.path, value = ?other, "collection value is not a map");
            return Vec::new();
        }
    };
    children
        .iter()
        .filter_map(|(raw_key, value)| {
            let decoded = Key::parse(raw_key.as_str())
                .map_err(EngineError::from)
                .and_then(|key| T::from_value(key, value).map_err(EngineError::from));
            match decoded {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(path = %snapshot.path, key = %raw_key, error = %e, "skipping undecodable entry");
                    None
                }
            }
        })
        .collect()
}

/// What a mirror held at one moment. `revision` grows with every pushed
/// snapshot, so consumers can tell when to recompute derived views.
#[derive(Debug, Clone)]
pub struct MirrorView<T> {
    pub items: Arc<[T]>,
    pub revision: u64,
    pub loaded: bool,
}

#[derive(Debug)]
struct MirrorState<T> {
    items: Arc<[T]>,
    revision: u64,
    loaded: bool,
    sequence: Option<u64>,
}

impl<T> MirrorState<T> {
    fn new() -> Self {
        Self {
            items: Arc::from(Vec::new()),
            revision: 0,
            loaded: false,
            sequence: None,
        }
    }

    /// The single entry point through which pushed snapshots change the mirror.
    /// A snapshot older than the one already applied is refused.
    fn apply(&mut self, sequence: u64, items: Vec<T>) -> bool {
        if self.sequence.is_some_and(|last| sequence < last) {
            return false;
        }
        self.items = items.into();
        self.revision += 1;
        self.loaded = true;
        self.sequence = Some(sequence);
        true
    }
}

/// Local copy of one collection, kept current by a standing subscription.
/// The subscription is released when the mirror is closed or dropped.
pub struct LiveCollection<T: Document> {
    state: Arc<Mutex<MirrorState<T>>>,
    subscription: Subscription,
}

impl<T> LiveCollection<T>
where
    T: Document + Send + Sync + 'static,
{
    pub fn attach<S: Store + ?Sized>(store: &S) -> Result<Self, EngineError> {
        let state = Arc::new(Mutex::new(MirrorState::new()));
        let sink = Arc::clone(&state);
        let path = T::COLLECTION.path();
        let subscription = store.subscribe(
            &path,
            Box::new(move |snapshot: &Snapshot| {
                let items = decode_snapshot::<T>(snapshot);
                let count = items.len();
                let mut state = sink.lock().unwrap_or_else(PoisonError::into_inner);
                if state.apply(snapshot.sequence, items) {
                    debug!(path = %snapshot.path, count, revision = state.revision, "mirror updated");
                } else {
                    debug!(path = %snapshot.path, sequence = snapshot.sequence, "stale snapshot ignored");
                }
            }),
        )?;
        info!(collection = %T::COLLECTION, "mirror attached");
        Ok(Self {
            state,
            subscription,
        })
    }

    fn lock(&self) -> MutexGuard<'_, MirrorState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> MirrorView<T> {
        let state = self.lock();
        MirrorView {
            items: Arc::clone(&state.items),
            revision: state.revision,
            loaded: state.loaded,
        }
    }

    pub fn items(&self) -> Arc<[T]> {
        Arc::clone(&self.lock().items)
    }

    pub fn get(&self, key: &Key) -> Option<T> {
        self.lock().items.iter().find(|item| item.key() == key).cloned()
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// False until the first snapshot has arrived.
    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn close(self) {
        info!(collection = %T::COLLECTION, "mirror closed");
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use findprice_core::{Collection, QuantityType, StorePath, category_value};

    fn snapshot(value: FieldValue) -> Snapshot {
        Snapshot {
            path: Collection::QuantityTypes.path(),
            value,
            sequence: 0,
        }
    }

    #[test]
    fn absent_collection_decodes_empty() {
        assert!(decode_snapshot::<QuantityType>(&snapshot(FieldValue::Null)).is_empty());
    }

    #[test]
    fn keys_become_ids() {
        let value = FieldValue::map([("k1", category_value("Litre"))]);
        let decoded = decode_snapshot::<QuantityType>(&snapshot(value));
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id.as_str(), "k1");
        assert_eq!(decoded[0].name, "Litre");
    }

    #[test]
    fn undecodable_entries_are_skipped() {
        let value = FieldValue::map([
            ("k1", category_value("Litre")),
            ("k2", FieldValue::from("not a document")),
            ("bad.key", category_value("Kg")),
        ]);
        let decoded = decode_snapshot::<QuantityType>(&snapshot(value));
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "Litre");
    }

    #[test]
    fn scalar_collection_value_decodes_empty() {
        let odd = Snapshot {
            path: StorePath::parse("quantityTypes").unwrap(),
            value: FieldValue::from(3.0),
            sequence: 0,
        };
        assert!(decode_snapshot::<QuantityType>(&odd).is_empty());
    }

    #[test]
    fn apply_bumps_revision_and_marks_loaded() {
        let mut state: MirrorState<u8> = MirrorState::new();
        assert!(state.apply(0, vec![1, 2]));
        assert!(state.apply(1, Vec::new()));
        assert_eq!(state.revision, 2);
        assert!(state.loaded);
        assert!(state.items.is_empty());
    }

    #[test]
    fn older_snapshot_arriving_late_is_refused() {
        let mut state: MirrorState<u8> = MirrorState::new();
        assert!(state.apply(4, vec![1]));
        assert!(state.apply(7, vec![1, 2, 3]));
        assert!(!state.apply(5, vec![1, 2]));
        assert_eq!(&*state.items, &[1, 2, 3]);
        assert_eq!(state.revision, 2);
        assert!(state.apply(7, vec![1, 2, 3]));
    }
}
