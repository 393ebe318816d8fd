//! Query error taxonomy.

use thiserror::Error;

use crate::geohash::GeoHashQuery;
use crate::store::StoreError;

/// Broad category of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse, returned synchronously and never delivered as an event.
    Usage,
    /// The store delivered data that breaks its contract.
    Integrity,
    /// A range subscription failed.
    Subscription,
}

/// Errors produced by a [`GeoQuery`](super::GeoQuery).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The listener is already registered.
    #[error("Listener is already registered with this query")]
    DuplicateListener,

    /// The listener was never registered (or was already removed).
    #[error("Listener is not registered with this query")]
    UnknownListener,

    /// A document arrived without a usable location field.
    #[error("Document '{document_id}' has no location field")]
    MissingLocation { document_id: String },

    /// A range subscription reported a failure.
    #[error("Subscription for range {range} failed: {source}")]
    Subscription {
        range: GeoHashQuery,
        #[source]
        source: StoreError,
    },
}

impl QueryError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateListener | Self::UnknownListener => ErrorKind::Usage,
            Self::MissingLocation { .. } => ErrorKind::Integrity,
            Self::Subscription { .. } => ErrorKind::Subscription,
        }
    }

    /// Whether the error signals corrupt upstream data rather than a
    /// transient or caller-side fault.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }
}
