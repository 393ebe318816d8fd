//! Document store abstraction.
//!
//! The query engine needs three things from a store: live subscriptions to an
//! ordered key range, a one-shot signal when a range's initial snapshot has
//! been delivered, and point reads by document id. Everything else (transport,
//! auth, persistence) stays behind the [`DocumentStore`] trait.
//!
//! # Notification flow
//!
//! ```text
//! DocumentStore ──► RangeSink ──(channel)──► GeoQuery notification pump
//!   (any thread)     tagged with              (serialized, never re-enters
//!                    SubscriptionId            the store while locked)
//! ```
//!
//! Stores never call into the query directly. They push
//! [`RangeNotification`]s through the [`RangeSink`] handed to them at
//! subscription time, which keeps store threads off the query's lock.

mod document;
mod memory;

pub use document::{DocumentSnapshot, KeyRange, GEOHASH_FIELD, LOCATION_FIELD};
pub use memory::MemoryStore;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::mpsc;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by a document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The caller may not read the requested data.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other store-side failure.
    #[error("Store error: {0}")]
    Other(String),
}

/// Identifies one range subscription for the lifetime of a query.
///
/// Ids are never reused, so notifications from a subscription that has since
/// been closed (and possibly reopened for the same range) can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wrap a raw id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// What happened to a range.
#[derive(Debug, Clone)]
pub enum NotificationKind {
    /// A document entered the range (including the initial snapshot).
    Added(DocumentSnapshot),
    /// A document inside the range changed.
    Changed(DocumentSnapshot),
    /// A document left the range or was deleted.
    Removed(DocumentSnapshot),
    /// The range's initial snapshot has been fully delivered.
    Loaded,
    /// The range subscription failed.
    Failed(StoreError),
}

/// A notification from one range subscription.
#[derive(Debug, Clone)]
pub struct RangeNotification {
    /// Subscription the notification belongs to.
    pub subscription: SubscriptionId,
    /// The notification itself.
    pub kind: NotificationKind,
}

/// Delivery handle a store uses to report on one subscription.
///
/// Every method returns `false` once the receiving query has gone away, which
/// stores may use to drop the subscriber early.
#[derive(Debug, Clone)]
pub struct RangeSink {
    subscription: SubscriptionId,
    tx: mpsc::UnboundedSender<RangeNotification>,
}

impl RangeSink {
    /// Create a sink that tags every notification with `subscription`.
    pub fn new(subscription: SubscriptionId, tx: mpsc::UnboundedSender<RangeNotification>) -> Self {
        Self { subscription, tx }
    }

    /// Report a document entering the range.
    pub fn added(&self, document: DocumentSnapshot) -> bool {
        self.send(NotificationKind::Added(document))
    }

    /// Report a document changing while inside the range.
    pub fn changed(&self, document: DocumentSnapshot) -> bool {
        self.send(NotificationKind::Changed(document))
    }

    /// Report a document leaving the range.
    pub fn removed(&self, document: DocumentSnapshot) -> bool {
        self.send(NotificationKind::Removed(document))
    }

    /// Report that the initial snapshot has been delivered.
    pub fn loaded(&self) -> bool {
        self.send(NotificationKind::Loaded)
    }

    /// Report a subscription failure.
    pub fn failed(&self, error: StoreError) -> bool {
        self.send(NotificationKind::Failed(error))
    }

    fn send(&self, kind: NotificationKind) -> bool {
        self.tx
            .send(RangeNotification {
                subscription: self.subscription,
                kind,
            })
            .is_ok()
    }
}

/// A live range subscription.
pub trait Subscription: Send + Sync {
    /// Stop delivering notifications. Calling it more than once is harmless.
    fn close(&self);
}

/// An ordered-key document store.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; sinks may be used from any
/// thread, including from inside `subscribe_range` itself.
pub trait DocumentStore: Send + Sync + 'static {
    /// Subscribe to documents whose geohash key lies in `range`.
    ///
    /// The store reports the current contents of the range as `added`
    /// notifications, followed by live `added`/`changed`/`removed`
    /// notifications until the returned handle is closed.
    fn subscribe_range(&self, range: &KeyRange, sink: RangeSink) -> Box<dyn Subscription>;

    /// Report, exactly once, when the initial snapshot of `range` has been
    /// delivered (`loaded`) or could not be delivered (`failed`).
    fn watch_initial_load(&self, range: &KeyRange, sink: RangeSink);

    /// Read a document by id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(doc))` if the document exists
    /// - `Ok(None)` if it does not
    /// - `Err(_)` if the read failed
    fn get_document(&self, id: &str) -> BoxFuture<'_, Result<Option<DocumentSnapshot>, StoreError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_tags_notifications() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = RangeSink::new(SubscriptionId::new(7), tx);

        assert!(sink.loaded());
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.subscription, SubscriptionId::new(7));
        assert!(matches!(notification.kind, NotificationKind::Loaded));
    }

    #[test]
    fn test_sink_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = RangeSink::new(SubscriptionId::new(1), tx);
        drop(rx);
        assert!(!sink.failed(StoreError::Unavailable("gone".to_string())));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::PermissionDenied("locations".to_string());
        assert_eq!(err.to_string(), "Permission denied: locations");
    }
}
