//! GeoQuery - live circular queries over ordered-key document stores
//!
//! This library keeps a continuously updated set of documents inside a
//! geographic circle, using a store that only supports subscriptions to
//! ordered key ranges. The circle is covered by geohash ranges, one store
//! subscription is kept per range, and raw store notifications are turned
//! into precise entered/exited/moved/changed events.
//!
//! # High-Level API
//!
//! ```ignore
//! use geoquery::coord::GeoPoint;
//! use geoquery::query::{ChannelListener, GeoQuery};
//! use geoquery::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let query = GeoQuery::new(store, GeoPoint::new(37.78, -122.40)?, 1.5);
//!
//! let (listener, mut events) = ChannelListener::new();
//! query.add_listener(listener)?;
//! ```

pub mod config;
pub mod coord;
pub mod geohash;
pub mod logging;
pub mod query;
pub mod store;

/// Version of the GeoQuery library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
