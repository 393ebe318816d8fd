//! Event dispatch queue.
//!
//! The query never calls listeners itself. It posts `(listener, event)` pairs
//! to an [`EventQueue`]; a single dispatcher task drains the queue in FIFO
//! order and runs the callbacks.
//!
//! ```text
//! GeoQuery (lock held) ──post──► EventQueue ══channel══► EventDispatcher task
//!                                                         └─► listener.on_*()
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::events::{QueryEvent, QueryListener};

struct Dispatch {
    listener: Arc<dyn QueryListener>,
    event: QueryEvent,
}

/// Sending half of the dispatch queue.
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl EventQueue {
    /// Queue `event` for delivery to `listener`.
    ///
    /// Never blocks. Events posted after the dispatcher has stopped are
    /// dropped.
    pub fn post(&self, listener: &Arc<dyn QueryListener>, event: QueryEvent) {
        let _ = self.tx.send(Dispatch {
            listener: Arc::clone(listener),
            event,
        });
    }

    /// Queue `event` for every listener in `listeners`.
    pub fn broadcast(&self, listeners: &[Arc<dyn QueryListener>], event: &QueryEvent) {
        for listener in listeners {
            self.post(listener, event.clone());
        }
    }
}

/// Receiving half of the dispatch queue.
pub struct EventDispatcher {
    rx: mpsc::UnboundedReceiver<Dispatch>,
}

impl EventDispatcher {
    /// Create a connected queue and dispatcher.
    pub fn new() -> (EventQueue, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventQueue { tx }, Self { rx })
    }

    /// Spawn the dispatch loop on `runtime`.
    ///
    /// The task runs until every [`EventQueue`] clone has been dropped and
    /// the queue is drained.
    pub fn start(self, runtime: &Handle) -> JoinHandle<()> {
        let mut rx = self.rx;
        runtime.spawn(async move {
            debug!("Event dispatcher started");

            while let Some(dispatch) = rx.recv().await {
                let Dispatch { listener, event } = dispatch;
                let outcome = catch_unwind(AssertUnwindSafe(|| event.deliver(listener.as_ref())));
                if outcome.is_err() {
                    error!(event = event.name(), "Listener panicked while handling event");
                }
            }

            debug!("Event dispatcher stopped (queue closed)");
        })
    }
}
