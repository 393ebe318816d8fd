//! Live circular queries over a range-subscription document store.
//!
//! A [`GeoQuery`] turns a circle into a set of geohash key ranges, keeps one
//! store subscription open per range, and translates the store's raw
//! add/change/remove notifications into membership events for its listeners.
//!
//! # Architecture
//!
//! ```text
//!                   ┌──────────────────────────────────────────────┐
//!                   │                  GeoQuery                    │
//!  set_center ─────►│  QueryCircle ──► RangeProvider ──► diff      │
//!  set_radius       │                                   │          │
//!  add_listener     │        active ranges ◄────────────┘          │
//!                   │        outstanding ranges                    │
//!                   │        LocationCache ◄── classify()          │
//!                   └───────────────┬──────────────────────────────┘
//!                                   │ QueryEvent
//!                                   ▼
//!                    EventQueue ──► dispatcher task ──► QueryListener
//! ```
//!
//! # Events
//!
//! | Event     | When                                                      |
//! |-----------|-----------------------------------------------------------|
//! | entered   | a document is now inside the circle and was not before    |
//! | exited    | a document was inside and no longer is, or was deleted    |
//! | moved     | a document inside the circle changed location             |
//! | changed   | a document inside the circle was updated (after `moved`)  |
//! | ready     | every active range has delivered its initial snapshot     |
//! | error     | a range subscription failed, or a document is corrupt     |

mod circle;
mod config;
mod coordinator;
mod dispatch;
mod error;
mod events;
mod location;

pub use circle::QueryCircle;
pub use config::GeoQueryConfig;
pub use coordinator::{GeoQuery, GeoQueryBuilder, QueryPhase};
pub use dispatch::{EventDispatcher, EventQueue};
pub use error::{ErrorKind, QueryError};
pub use events::{ChannelListener, KeyListener, KeyListenerBridge, QueryEvent, QueryListener};
pub use location::{classify, LocationCache, LocationInfo, Transition};
