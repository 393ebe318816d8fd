//! Query coordinator.
//!
//! [`GeoQuery`] owns the circle, the active range subscriptions, the
//! outstanding (still loading) ranges and the location cache. All of it sits
//! behind one `parking_lot::Mutex`; public calls and the notification pump
//! take turns on it, and nothing awaits or calls a listener while holding it.
//!
//! ```text
//!  caller threads ──set_center/add_listener/...──┐
//!                                                ▼
//!                                     ┌──────────────────────┐
//!  DocumentStore ─RangeSink─► channel ─► pump ─► QueryState   │──post──► EventQueue ─► dispatcher ─► listeners
//!        ▲                            └──────────────────────┘
//!        └──────────── subscribe_range / close / get_document
//! ```
//!
//! # Lifecycle
//!
//! A query is idle until its first listener arrives, which triggers the first
//! resync. Removing the last listener tears every subscription down and
//! forgets all cached documents; the next listener starts from scratch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::circle::QueryCircle;
use super::config::GeoQueryConfig;
use super::dispatch::{EventDispatcher, EventQueue};
use super::events::{same_listener, QueryEvent, QueryListener};
use super::location::LocationCache;
use super::QueryError;
use crate::coord::GeoPoint;
use crate::geohash::{GeoHash, GeoHashQuery, GeoHashRangeProvider, RangeProvider};
use crate::store::{
    DocumentSnapshot, DocumentStore, NotificationKind, RangeNotification, RangeSink, StoreError,
    Subscription, SubscriptionId,
};

/// Coarse state of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// No active ranges.
    Idle,
    /// At least one range has not delivered its initial snapshot.
    Loading,
    /// Every active range has delivered its initial snapshot.
    Ready,
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

struct ActiveRange {
    id: SubscriptionId,
    handle: Box<dyn Subscription>,
}

struct QueryState {
    circle: QueryCircle,
    listeners: Vec<Arc<dyn QueryListener>>,
    /// `None` until the first resync, and again after a reset.
    active: Option<HashMap<GeoHashQuery, ActiveRange>>,
    subscriptions: HashMap<SubscriptionId, GeoHashQuery>,
    outstanding: HashSet<GeoHashQuery>,
    locations: LocationCache,
}

impl QueryState {
    fn new(circle: QueryCircle) -> Self {
        Self {
            circle,
            listeners: Vec::new(),
            active: None,
            subscriptions: HashMap::new(),
            outstanding: HashSet::new(),
            locations: LocationCache::new(),
        }
    }

    fn covers(&self, hash: &GeoHash) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.keys().any(|range| range.contains_geohash(hash)))
    }

    fn tracked_range(&self, id: SubscriptionId) -> Option<&GeoHashQuery> {
        self.subscriptions.get(&id)
    }

    fn phase(&self) -> QueryPhase {
        if !self.outstanding.is_empty() {
            QueryPhase::Loading
        } else if self.active.as_ref().is_some_and(|active| !active.is_empty()) {
            QueryPhase::Ready
        } else {
            QueryPhase::Idle
        }
    }
}

struct Shared {
    state: Mutex<QueryState>,
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn RangeProvider>,
    config: GeoQueryConfig,
    events: EventQueue,
    notify_tx: mpsc::UnboundedSender<RangeNotification>,
    next_subscription: AtomicU64,
}

impl Shared {
    fn circle(&self, center: GeoPoint, radius_km: f64) -> QueryCircle {
        QueryCircle::new(center, radius_km, self.config.max_radius_km)
    }

    fn broadcast(&self, state: &QueryState, events: Vec<QueryEvent>) {
        for event in events {
            self.events.broadcast(&state.listeners, &event);
        }
    }

    /// Bring the active ranges in line with the current circle.
    fn resync(&self, state: &mut QueryState) {
        let required = self
            .provider
            .covering_ranges(state.circle.center(), state.circle.radius_m());
        let mut active = state.active.take().unwrap_or_default();

        let before = active.len();
        active.retain(|range, entry| {
            if required.contains(range) {
                return true;
            }
            entry.handle.close();
            state.subscriptions.remove(&entry.id);
            state.outstanding.remove(range);
            debug!(range = %range, subscription = %entry.id, "Closed range subscription");
            false
        });
        let closed = before - active.len();

        let mut opened = 0;
        for range in &required {
            if active.contains_key(range) {
                continue;
            }
            let id = SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::Relaxed));
            let bounds = range.key_range();

            state.outstanding.insert(range.clone());
            state.subscriptions.insert(id, range.clone());
            let handle = self
                .store
                .subscribe_range(&bounds, RangeSink::new(id, self.notify_tx.clone()));
            self.store
                .watch_initial_load(&bounds, RangeSink::new(id, self.notify_tx.clone()));
            active.insert(range.clone(), ActiveRange { id, handle });
            opened += 1;
            debug!(range = %range, subscription = %id, "Opened range subscription");
        }
        state.active = Some(active);

        debug!(
            center = %state.circle.center(),
            radius_km = state.circle.radius_km(),
            ranges = required.len(),
            opened,
            closed,
            "Resynced covering ranges"
        );

        let circle = state.circle;
        let events = state.locations.reclassify(&circle);
        self.broadcast(state, events);

        let active = state.active.as_ref();
        let pruned = state.locations.retain_covered(|hash| {
            active.is_some_and(|ranges| ranges.keys().any(|range| range.contains_geohash(hash)))
        });
        if pruned > 0 {
            debug!(pruned, "Dropped documents no longer covered by any range");
        }

        if state.outstanding.is_empty() {
            self.fire_ready(state);
        }
    }

    /// Close every subscription and forget everything derived from them.
    fn reset(&self, state: &mut QueryState) {
        if let Some(active) = state.active.take() {
            for (range, entry) in active {
                entry.handle.close();
                debug!(range = %range, subscription = %entry.id, "Closed range subscription");
            }
        }
        state.subscriptions.clear();
        state.outstanding.clear();
        state.locations.clear();
        debug!("Query reset to idle");
    }

    fn fire_ready(&self, state: &QueryState) {
        info!(
            ranges = state.active.as_ref().map_or(0, HashMap::len),
            documents = state.locations.len(),
            "Geo query ready"
        );
        self.broadcast(state, vec![QueryEvent::Ready]);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notification handling
    // ─────────────────────────────────────────────────────────────────────────

    async fn handle_notification(&self, notification: RangeNotification) {
        let RangeNotification { subscription, kind } = notification;
        match kind {
            NotificationKind::Added(document) | NotificationKind::Changed(document) => {
                self.handle_upsert(subscription, document)
            }
            NotificationKind::Removed(document) => {
                self.handle_removed(subscription, document).await
            }
            NotificationKind::Loaded => self.handle_loaded(subscription),
            NotificationKind::Failed(error) => self.handle_failed(subscription, error),
        }
    }

    fn handle_upsert(&self, subscription: SubscriptionId, document: DocumentSnapshot) {
        let mut state = self.state.lock();
        if state.tracked_range(subscription).is_none() {
            trace!(subscription = %subscription, document = document.id(), "Dropping update from inactive subscription");
            return;
        }

        let Some(location) = document.location() else {
            error!(
                document = document.id(),
                subscription = %subscription,
                "Document has no location field, skipping notification"
            );
            let error = QueryError::MissingLocation {
                document_id: document.id().to_string(),
            };
            self.broadcast(&state, vec![QueryEvent::Error(error)]);
            return;
        };

        let circle = state.circle;
        let events = state.locations.update(document, location, &circle);
        self.broadcast(&state, events);
    }

    async fn handle_removed(&self, subscription: SubscriptionId, document: DocumentSnapshot) {
        let id = document.id().to_string();
        {
            let state = self.state.lock();
            if state.tracked_range(subscription).is_none() {
                trace!(subscription = %subscription, document = %id, "Dropping removal from inactive subscription");
                return;
            }
            if state.locations.get(&id).is_none() {
                return;
            }
        }

        let current = match self.store.get_document(&id).await {
            Ok(found) => found.and_then(|doc| doc.location()),
            Err(error) => {
                warn!(document = %id, error = %error, "Point read failed while handling removal");
                if !self.config.exit_on_read_failure {
                    return;
                }
                None
            }
        };

        let mut state = self.state.lock();
        if current.is_some_and(|location| state.covers(&GeoHash::new(location))) {
            trace!(document = %id, "Document still covered by an active range, keeping it");
            return;
        }
        if let Some(info) = state.locations.remove(&id) {
            if info.in_query {
                self.broadcast(
                    &state,
                    vec![QueryEvent::Exited {
                        document: info.document,
                    }],
                );
            }
        }
    }

    fn handle_loaded(&self, subscription: SubscriptionId) {
        let mut state = self.state.lock();
        let Some(range) = state.tracked_range(subscription).cloned() else {
            trace!(subscription = %subscription, "Dropping load signal from inactive subscription");
            return;
        };

        if state.outstanding.remove(&range) {
            debug!(range = %range, remaining = state.outstanding.len(), "Range finished initial load");
            if state.outstanding.is_empty() {
                self.fire_ready(&state);
            }
        }
    }

    fn handle_failed(&self, subscription: SubscriptionId, source: StoreError) {
        let state = self.state.lock();
        let Some(range) = state.tracked_range(subscription).cloned() else {
            trace!(subscription = %subscription, "Dropping failure from inactive subscription");
            return;
        };

        warn!(range = %range, error = %source, "Range subscription failed");
        self.broadcast(
            &state,
            vec![QueryEvent::Error(QueryError::Subscription { range, source })],
        );
    }
}

async fn run_pump(
    shared: Arc<Shared>,
    mut rx: mpsc::UnboundedReceiver<RangeNotification>,
    cancel: CancellationToken,
) {
    debug!("Notification pump started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(notification) => shared.handle_notification(notification).await,
                None => break,
            },
        }
    }

    debug!("Notification pump stopped");
}

// ─────────────────────────────────────────────────────────────────────────────
// Public surface
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`GeoQuery`].
pub struct GeoQueryBuilder {
    store: Arc<dyn DocumentStore>,
    center: GeoPoint,
    radius_km: f64,
    provider: Option<Arc<dyn RangeProvider>>,
    config: GeoQueryConfig,
    runtime: Option<Handle>,
}

impl GeoQueryBuilder {
    /// Use a custom range provider instead of [`GeoHashRangeProvider`].
    pub fn range_provider(mut self, provider: Arc<dyn RangeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use a custom configuration.
    pub fn config(mut self, config: GeoQueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the query's background tasks on `runtime`.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Create the query and spawn its background tasks.
    ///
    /// The query stays idle until its first listener is added.
    ///
    /// # Panics
    ///
    /// Panics if no runtime was given and this is called outside a Tokio
    /// runtime.
    pub fn start(self) -> GeoQuery {
        let runtime = self.runtime.unwrap_or_else(Handle::current);
        let (events, dispatcher) = EventDispatcher::new();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let circle = QueryCircle::new(self.center, self.radius_km, self.config.max_radius_km);

        let shared = Arc::new(Shared {
            state: Mutex::new(QueryState::new(circle)),
            store: self.store,
            provider: self
                .provider
                .unwrap_or_else(|| Arc::new(GeoHashRangeProvider::new())),
            config: self.config,
            events,
            notify_tx,
            next_subscription: AtomicU64::new(0),
        });

        let cancel = CancellationToken::new();
        dispatcher.start(&runtime);
        runtime.spawn(run_pump(Arc::clone(&shared), notify_rx, cancel.clone()));

        GeoQuery { shared, cancel }
    }
}

/// A live geo query over a [`DocumentStore`].
///
/// Every method is safe to call from any thread, and from inside listener
/// callbacks.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let query = GeoQuery::builder(store, GeoPoint::new(51.5, -0.12)?, 2.0).start();
/// let (listener, mut events) = ChannelListener::new();
/// query.add_listener(listener)?;
/// while let Some(event) = events.recv().await {
///     println!("{} {:?}", event.name(), event.document_id());
/// }
/// ```
pub struct GeoQuery {
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl GeoQuery {
    /// Start building a query around `center` with `radius_km`.
    pub fn builder(store: Arc<dyn DocumentStore>, center: GeoPoint, radius_km: f64) -> GeoQueryBuilder {
        GeoQueryBuilder {
            store,
            center,
            radius_km,
            provider: None,
            config: GeoQueryConfig::default(),
            runtime: None,
        }
    }

    /// Create a query with default provider and configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(store: Arc<dyn DocumentStore>, center: GeoPoint, radius_km: f64) -> Self {
        Self::builder(store, center, radius_km).start()
    }

    /// Current center.
    pub fn center(&self) -> GeoPoint {
        self.shared.state.lock().circle.center()
    }

    /// Current radius in kilometers, after clamping.
    pub fn radius(&self) -> f64 {
        self.shared.state.lock().circle.radius_km()
    }

    /// Move the circle.
    pub fn set_center(&self, center: GeoPoint) {
        let mut state = self.shared.state.lock();
        let radius_km = state.circle.radius_km();
        self.apply_circle(&mut state, center, radius_km);
    }

    /// Resize the circle. The radius is clamped to the configured maximum.
    pub fn set_radius(&self, radius_km: f64) {
        let mut state = self.shared.state.lock();
        let center = state.circle.center();
        self.apply_circle(&mut state, center, radius_km);
    }

    /// Move and resize the circle in one step.
    pub fn set_location(&self, center: GeoPoint, radius_km: f64) {
        let mut state = self.shared.state.lock();
        self.apply_circle(&mut state, center, radius_km);
    }

    fn apply_circle(&self, state: &mut QueryState, center: GeoPoint, radius_km: f64) {
        state.circle = self.shared.circle(center, radius_km);
        if !state.listeners.is_empty() {
            self.shared.resync(state);
        }
    }

    /// Register a listener.
    ///
    /// The first listener starts the query. Later listeners immediately
    /// receive an `entered` event for every document currently inside the
    /// circle, plus `ready` if the query has already settled.
    ///
    /// # Errors
    ///
    /// [`QueryError::DuplicateListener`] if this listener is already
    /// registered.
    pub fn add_listener(&self, listener: Arc<dyn QueryListener>) -> Result<(), QueryError> {
        let mut state = self.shared.state.lock();
        if state.listeners.iter().any(|l| same_listener(l, &listener)) {
            return Err(QueryError::DuplicateListener);
        }
        state.listeners.push(Arc::clone(&listener));

        if state.active.is_none() {
            self.shared.resync(&mut state);
            return Ok(());
        }

        for info in state.locations.in_query() {
            self.shared.events.post(
                &listener,
                QueryEvent::Entered {
                    document: info.document.clone(),
                    location: info.location,
                },
            );
        }
        if state.outstanding.is_empty() {
            self.shared.events.post(&listener, QueryEvent::Ready);
        }
        Ok(())
    }

    /// Unregister a listener. Removing the last listener resets the query.
    ///
    /// # Errors
    ///
    /// [`QueryError::UnknownListener`] if the listener is not registered.
    pub fn remove_listener<L: QueryListener + ?Sized>(&self, listener: &Arc<L>) -> Result<(), QueryError> {
        let mut state = self.shared.state.lock();
        let position = state
            .listeners
            .iter()
            .position(|l| same_listener(l, listener))
            .ok_or(QueryError::UnknownListener)?;
        state.listeners.remove(position);

        if state.listeners.is_empty() {
            self.shared.reset(&mut state);
        }
        Ok(())
    }

    /// Unregister every listener and reset the query.
    pub fn remove_all_listeners(&self) {
        let mut state = self.shared.state.lock();
        state.listeners.clear();
        self.shared.reset(&mut state);
    }

    /// Coarse state of the query.
    pub fn phase(&self) -> QueryPhase {
        self.shared.state.lock().phase()
    }

    /// Ranges with an open subscription.
    pub fn active_ranges(&self) -> HashSet<GeoHashQuery> {
        self.shared
            .state
            .lock()
            .active
            .as_ref()
            .map(|active| active.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of ranges still waiting for their initial snapshot.
    pub fn outstanding_range_count(&self) -> usize {
        self.shared.state.lock().outstanding.len()
    }

    /// Number of documents in the location cache.
    pub fn cached_document_count(&self) -> usize {
        self.shared.state.lock().locations.len()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }
}

impl Drop for GeoQuery {
    fn drop(&mut self) {
        self.cancel.cancel();
        let mut state = self.shared.state.lock();
        state.listeners.clear();
        self.shared.reset(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ChannelListener;
    use crate::store::MemoryStore;
    use serde_json::Map;
    use std::time::Duration;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn doc(id: &str, lat: f64, lon: f64) -> DocumentSnapshot {
        DocumentSnapshot::located(id, point(lat, lon), Map::new())
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<QueryEvent>) -> QueryEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("listener channel closed")
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<QueryEvent>) -> Vec<QueryEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_idle_until_first_listener() {
        let store = Arc::new(MemoryStore::new());
        let query = GeoQuery::new(store.clone(), point(0.0, 0.0), 1.0);

        assert_eq!(query.phase(), QueryPhase::Idle);
        assert!(query.active_ranges().is_empty());
        assert_eq!(store.subscriber_count(), 0);

        query.set_radius(2.0);
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(query.radius(), 2.0);
    }

    #[tokio::test]
    async fn test_first_listener_syncs_and_becomes_ready() {
        let store = Arc::new(MemoryStore::new());
        store.set_document(doc("near", 0.0, 0.001));
        let query = GeoQuery::new(store.clone(), point(0.0, 0.0), 1.0);

        let (listener, mut rx) = ChannelListener::new();
        query.add_listener(listener).unwrap();

        let expected = GeoHashRangeProvider::new().covering_ranges(point(0.0, 0.0), 1000.0);
        assert_eq!(query.active_ranges(), expected);
        assert_eq!(store.subscriber_count(), expected.len());

        let mut names = Vec::new();
        while names.len() < 2 {
            names.push(next(&mut rx).await.name());
        }
        names.sort();
        assert_eq!(names, vec!["entered", "ready"]);
        assert_eq!(query.phase(), QueryPhase::Ready);
        assert_eq!(query.cached_document_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_listener() {
        let store = Arc::new(MemoryStore::new());
        let query = GeoQuery::new(store, point(0.0, 0.0), 1.0);

        let (listener, _rx) = ChannelListener::new();
        query.add_listener(listener.clone()).unwrap();
        assert_eq!(
            query.add_listener(listener.clone()),
            Err(QueryError::DuplicateListener)
        );

        let (stranger, _rx2) = ChannelListener::new();
        assert_eq!(query.remove_listener(&stranger), Err(QueryError::UnknownListener));

        query.remove_listener(&listener).unwrap();
        assert_eq!(query.remove_listener(&listener), Err(QueryError::UnknownListener));
    }

    #[tokio::test]
    async fn test_last_listener_resets() {
        let store = Arc::new(MemoryStore::new());
        store.set_document(doc("near", 0.0, 0.001));
        let query = GeoQuery::new(store.clone(), point(0.0, 0.0), 1.0);

        let (listener, mut rx) = ChannelListener::new();
        query.add_listener(listener.clone()).unwrap();
        next(&mut rx).await;
        settle().await;
        assert_eq!(query.cached_document_count(), 1);

        query.remove_listener(&listener).unwrap();
        assert_eq!(query.phase(), QueryPhase::Idle);
        assert_eq!(query.cached_document_count(), 0);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_late_listener_gets_replay_and_ready() {
        let store = Arc::new(MemoryStore::new());
        store.set_document(doc("near", 0.0, 0.001));
        let query = GeoQuery::new(store, point(0.0, 0.0), 1.0);

        let (first, mut first_rx) = ChannelListener::new();
        query.add_listener(first).unwrap();
        next(&mut first_rx).await;
        next(&mut first_rx).await;
        settle().await;

        let (second, mut second_rx) = ChannelListener::new();
        query.add_listener(second).unwrap();

        let replay = next(&mut second_rx).await;
        assert_eq!(replay.name(), "entered");
        assert_eq!(replay.document_id(), Some("near"));
        assert_eq!(next(&mut second_rx).await, QueryEvent::Ready);

        settle().await;
        assert!(drain(&mut first_rx).is_empty());
    }

    #[tokio::test]
    async fn test_held_loads_keep_query_loading() {
        let store = Arc::new(MemoryStore::new());
        store.hold_initial_loads();
        let query = GeoQuery::new(store.clone(), point(0.0, 0.0), 1.0);

        let (listener, mut rx) = ChannelListener::new();
        query.add_listener(listener).unwrap();
        settle().await;

        assert_eq!(query.phase(), QueryPhase::Loading);
        assert_eq!(query.outstanding_range_count(), query.active_ranges().len());
        assert!(drain(&mut rx).is_empty());

        store.release_initial_loads();
        assert_eq!(next(&mut rx).await, QueryEvent::Ready);
        settle().await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(query.phase(), QueryPhase::Ready);
    }

    #[tokio::test]
    async fn test_missing_location_is_fatal_error_event() {
        let store = Arc::new(MemoryStore::new());
        let query = GeoQuery::new(store.clone(), point(0.0, 0.0), 1.0);
        let (listener, mut rx) = ChannelListener::new();
        query.add_listener(listener).unwrap();
        assert_eq!(next(&mut rx).await, QueryEvent::Ready);

        let hash = GeoHash::new(point(0.0, 0.001));
        let mut fields = Map::new();
        fields.insert(
            crate::store::GEOHASH_FIELD.to_string(),
            serde_json::Value::String(hash.to_string()),
        );
        store.set_document(DocumentSnapshot::new("broken", fields));

        match next(&mut rx).await {
            QueryEvent::Error(error) => {
                assert!(error.is_fatal());
                assert_eq!(
                    error,
                    QueryError::MissingLocation {
                        document_id: "broken".to_string()
                    }
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(query.cached_document_count(), 0);
    }

    #[tokio::test]
    async fn test_read_failure_policy_keeps_record() {
        let store = Arc::new(MemoryStore::new());
        store.set_document(doc("near", 0.0, 0.001));
        let query = GeoQuery::builder(store.clone(), point(0.0, 0.0), 1.0)
            .config(GeoQueryConfig::default().with_exit_on_read_failure(false))
            .start();
        let (listener, mut rx) = ChannelListener::new();
        query.add_listener(listener).unwrap();
        next(&mut rx).await;
        next(&mut rx).await;

        store.set_read_failure(Some(StoreError::Unavailable("offline".to_string())));
        store.remove_document("near");
        settle().await;

        assert!(drain(&mut rx).is_empty());
        assert_eq!(query.cached_document_count(), 1);
    }

    #[tokio::test]
    async fn test_read_failure_default_exits() {
        let store = Arc::new(MemoryStore::new());
        store.set_document(doc("near", 0.0, 0.001));
        let query = GeoQuery::new(store.clone(), point(0.0, 0.0), 1.0);
        let (listener, mut rx) = ChannelListener::new();
        query.add_listener(listener).unwrap();
        next(&mut rx).await;
        next(&mut rx).await;

        store.set_read_failure(Some(StoreError::Unavailable("offline".to_string())));
        store.remove_document("near");

        let event = next(&mut rx).await;
        assert_eq!(event.name(), "exited");
        assert_eq!(query.cached_document_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_closes_subscriptions() {
        let store = Arc::new(MemoryStore::new());
        let query = GeoQuery::new(store.clone(), point(0.0, 0.0), 1.0);
        let (listener, _rx) = ChannelListener::new();
        query.add_listener(listener).unwrap();
        assert!(store.subscriber_count() > 0);

        drop(query);
        assert_eq!(store.subscriber_count(), 0);
    }
}
