//! Listener traits and the event vocabulary delivered to them.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::QueryError;
use crate::coord::GeoPoint;
use crate::store::DocumentSnapshot;

/// Observer of a [`GeoQuery`](super::GeoQuery).
///
/// Callbacks run on the query's dispatcher task, one at a time, never while
/// the query's internal lock is held. A listener may call back into the query
/// from any callback.
///
/// Listener identity is the identity of the `Arc` it was registered with.
pub trait QueryListener: Send + Sync + 'static {
    /// A document moved into the circle (or was already inside when the
    /// listener joined).
    fn on_document_entered(&self, document: &DocumentSnapshot, location: GeoPoint);

    /// A document that was inside the circle is no longer inside it.
    fn on_document_exited(&self, document: &DocumentSnapshot);

    /// A document inside the circle changed location. Always followed by
    /// [`on_document_changed`](Self::on_document_changed) for the same update.
    fn on_document_moved(&self, _document: &DocumentSnapshot, _location: GeoPoint) {}

    /// A document inside the circle was updated.
    fn on_document_changed(&self, _document: &DocumentSnapshot, _location: GeoPoint) {}

    /// Every active range has delivered its initial snapshot.
    fn on_query_ready(&self) {}

    /// A range subscription failed, or the store delivered corrupt data.
    fn on_query_error(&self, _error: &QueryError) {}
}

/// Key-only observer, for callers that only care about document ids.
pub trait KeyListener: Send + Sync + 'static {
    /// A document entered the circle.
    fn on_key_entered(&self, key: &str, location: GeoPoint);

    /// A document left the circle.
    fn on_key_exited(&self, key: &str);

    /// A document moved within the circle.
    fn on_key_moved(&self, _key: &str, _location: GeoPoint) {}

    /// The query is ready.
    fn on_query_ready(&self) {}

    /// The query reported an error.
    fn on_query_error(&self, _error: &QueryError) {}
}

/// Adapts a [`KeyListener`] into a [`QueryListener`].
///
/// Change notifications have no key-level equivalent and are dropped.
pub struct KeyListenerBridge<L> {
    inner: L,
}

impl<L: KeyListener> KeyListenerBridge<L> {
    /// Wrap a key listener, ready to be registered.
    pub fn new(inner: L) -> Arc<Self> {
        Arc::new(Self { inner })
    }

    /// The wrapped listener.
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: KeyListener> QueryListener for KeyListenerBridge<L> {
    fn on_document_entered(&self, document: &DocumentSnapshot, location: GeoPoint) {
        self.inner.on_key_entered(document.id(), location);
    }

    fn on_document_exited(&self, document: &DocumentSnapshot) {
        self.inner.on_key_exited(document.id());
    }

    fn on_document_moved(&self, document: &DocumentSnapshot, location: GeoPoint) {
        self.inner.on_key_moved(document.id(), location);
    }

    fn on_query_ready(&self) {
        self.inner.on_query_ready();
    }

    fn on_query_error(&self, error: &QueryError) {
        self.inner.on_query_error(error);
    }
}

/// One listener callback, as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
    Entered {
        document: DocumentSnapshot,
        location: GeoPoint,
    },
    Exited {
        document: DocumentSnapshot,
    },
    Moved {
        document: DocumentSnapshot,
        location: GeoPoint,
    },
    Changed {
        document: DocumentSnapshot,
        location: GeoPoint,
    },
    Ready,
    Error(QueryError),
}

impl QueryEvent {
    /// Id of the document the event is about, if any.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Self::Entered { document, .. }
            | Self::Exited { document }
            | Self::Moved { document, .. }
            | Self::Changed { document, .. } => Some(document.id()),
            Self::Ready | Self::Error(_) => None,
        }
    }

    /// Short lowercase name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Entered { .. } => "entered",
            Self::Exited { .. } => "exited",
            Self::Moved { .. } => "moved",
            Self::Changed { .. } => "changed",
            Self::Ready => "ready",
            Self::Error(_) => "error",
        }
    }

    /// Invoke the matching callback on `listener`.
    pub fn deliver(&self, listener: &dyn QueryListener) {
        match self {
            Self::Entered { document, location } => listener.on_document_entered(document, *location),
            Self::Exited { document } => listener.on_document_exited(document),
            Self::Moved { document, location } => listener.on_document_moved(document, *location),
            Self::Changed { document, location } => listener.on_document_changed(document, *location),
            Self::Ready => listener.on_query_ready(),
            Self::Error(error) => listener.on_query_error(error),
        }
    }
}

/// Listener that forwards every callback into an unbounded channel.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<QueryEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its channel.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<QueryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn forward(&self, event: QueryEvent) {
        // Receiver gone means nobody is watching any more.
        let _ = self.tx.send(event);
    }
}

impl QueryListener for ChannelListener {
    fn on_document_entered(&self, document: &DocumentSnapshot, location: GeoPoint) {
        self.forward(QueryEvent::Entered {
            document: document.clone(),
            location,
        });
    }

    fn on_document_exited(&self, document: &DocumentSnapshot) {
        self.forward(QueryEvent::Exited {
            document: document.clone(),
        });
    }

    fn on_document_moved(&self, document: &DocumentSnapshot, location: GeoPoint) {
        self.forward(QueryEvent::Moved {
            document: document.clone(),
            location,
        });
    }

    fn on_document_changed(&self, document: &DocumentSnapshot, location: GeoPoint) {
        self.forward(QueryEvent::Changed {
            document: document.clone(),
            location,
        });
    }

    fn on_query_ready(&self) {
        self.forward(QueryEvent::Ready);
    }

    fn on_query_error(&self, error: &QueryError) {
        self.forward(QueryEvent::Error(error.clone()));
    }
}

/// Whether a registered listener and another handle refer to the same
/// allocation. Vtable pointers are ignored.
pub(crate) fn same_listener<L: ?Sized>(registered: &Arc<dyn QueryListener>, other: &Arc<L>) -> bool {
    std::ptr::eq(Arc::as_ptr(registered) as *const (), Arc::as_ptr(other) as *const ())
}
