//! In-process document store.
//!
//! Documents live in an ordered map keyed by id. Range membership is decided
//! by each document's geohash field, so a document without one is never part
//! of any range. Test controls let callers hold back initial-load signals,
//! fail them, or make point reads fail.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use super::{BoxFuture, DocumentSnapshot, DocumentStore, KeyRange, RangeSink, StoreError, Subscription};

/// How `watch_initial_load` answers.
#[derive(Debug, Clone)]
enum LoadMode {
    Immediate,
    Hold,
    Fail(StoreError),
}

#[derive(Debug)]
struct Subscriber {
    range: KeyRange,
    sink: RangeSink,
}

#[derive(Debug)]
struct Inner {
    documents: BTreeMap<String, DocumentSnapshot>,
    subscribers: HashMap<u64, Subscriber>,
    next_id: u64,
    load_mode: LoadMode,
    pending_loads: Vec<RangeSink>,
    read_failure: Option<StoreError>,
}

fn in_range(document: &DocumentSnapshot, range: &KeyRange) -> bool {
    document.geohash().is_some_and(|hash| range.contains(hash))
}

/// A thread-safe in-memory [`DocumentStore`].
///
/// Cloning is cheap; clones share the same documents and subscribers.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store that signals initial loads immediately.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                documents: BTreeMap::new(),
                subscribers: HashMap::new(),
                next_id: 0,
                load_mode: LoadMode::Immediate,
                pending_loads: Vec::new(),
                read_failure: None,
            })),
        }
    }

    /// Insert or replace a document, notifying every affected subscriber.
    pub fn set_document(&self, document: DocumentSnapshot) {
        let mut inner = self.inner.lock();
        let previous = inner
            .documents
            .insert(document.id().to_string(), document.clone());

        inner.subscribers.retain(|_, subscriber| {
            let was_in = previous
                .as_ref()
                .is_some_and(|old| in_range(old, &subscriber.range));
            let is_in = in_range(&document, &subscriber.range);
            match (was_in, is_in) {
                (true, true) => subscriber.sink.changed(document.clone()),
                (true, false) => match previous.as_ref() {
                    Some(old) => subscriber.sink.removed(old.clone()),
                    None => true,
                },
                (false, true) => subscriber.sink.added(document.clone()),
                (false, false) => true,
            }
        });
    }

    /// Delete a document, returning it if it existed.
    pub fn remove_document(&self, id: &str) -> Option<DocumentSnapshot> {
        let mut inner = self.inner.lock();
        let removed = inner.documents.remove(id)?;
        inner.subscribers.retain(|_, subscriber| {
            if in_range(&removed, &subscriber.range) {
                subscriber.sink.removed(removed.clone())
            } else {
                true
            }
        });
        Some(removed)
    }

    /// Queue initial-load signals until [`release_initial_loads`](Self::release_initial_loads).
    pub fn hold_initial_loads(&self) {
        self.inner.lock().load_mode = LoadMode::Hold;
    }

    /// Deliver every queued initial-load signal and stop holding new ones.
    pub fn release_initial_loads(&self) {
        let pending = {
            let mut inner = self.inner.lock();
            inner.load_mode = LoadMode::Immediate;
            std::mem::take(&mut inner.pending_loads)
        };
        for sink in pending {
            sink.loaded();
        }
    }

    /// Answer every future initial-load watch with `error`.
    pub fn fail_initial_loads(&self, error: StoreError) {
        self.inner.lock().load_mode = LoadMode::Fail(error);
    }

    /// Make point reads fail with `error`, or succeed again with `None`.
    pub fn set_read_failure(&self, error: Option<StoreError>) {
        self.inner.lock().read_failure = error;
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.inner.lock().documents.len()
    }

    /// Number of open range subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Number of initial-load signals currently held back.
    pub fn pending_load_count(&self) -> usize {
        self.inner.lock().pending_loads.len()
    }
}

/// Handle returned by [`MemoryStore::subscribe_range`].
struct MemorySubscription {
    id: u64,
    inner: Weak<Mutex<Inner>>,
}

impl Subscription for MemorySubscription {
    fn close(&self) {
        if let Some(inner) = self.inner.upgrade() {
            if inner.lock().subscribers.remove(&self.id).is_some() {
                trace!(subscriber = self.id, "Memory store subscription closed");
            }
        }
    }
}

impl DocumentStore for MemoryStore {
    fn subscribe_range(&self, range: &KeyRange, sink: RangeSink) -> Box<dyn Subscription> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        for document in inner.documents.values() {
            if in_range(document, range) {
                sink.added(document.clone());
            }
        }

        inner.subscribers.insert(
            id,
            Subscriber {
                range: range.clone(),
                sink,
            },
        );

        Box::new(MemorySubscription {
            id,
            inner: Arc::downgrade(&self.inner),
        })
    }

    fn watch_initial_load(&self, _range: &KeyRange, sink: RangeSink) {
        let mut inner = self.inner.lock();
        match inner.load_mode.clone() {
            LoadMode::Immediate => {
                sink.loaded();
            }
            LoadMode::Hold => inner.pending_loads.push(sink),
            LoadMode::Fail(error) => {
                sink.failed(error);
            }
        }
    }

    fn get_document(&self, id: &str) -> BoxFuture<'_, Result<Option<DocumentSnapshot>, StoreError>> {
        let result = {
            let inner = self.inner.lock();
            match &inner.read_failure {
                Some(error) => Err(error.clone()),
                None => Ok(inner.documents.get(id).cloned()),
            }
        };
        Box::pin(async move { result })
    }
}
