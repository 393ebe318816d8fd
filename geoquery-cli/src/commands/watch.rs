//! `geoquery watch` - replay a fixture scenario against a live query.
//!
//! Seeds an in-memory store, starts a query, prints the initial events, then
//! applies each scripted step and prints what the query reports for it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use geoquery::config::ConfigFile;
use geoquery::query::{ChannelListener, GeoQuery, QueryEvent};
use geoquery::store::MemoryStore;
use tokio::sync::mpsc;
use tracing::info;

use super::common::CircleArgs;
use crate::error::CliError;
use crate::fixture::{Fixture, Step};

/// Arguments for the watch command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Scenario fixture (JSON)
    #[arg(long)]
    pub fixture: PathBuf,

    #[command(flatten)]
    pub circle: CircleArgs,

    /// How long the query must stay quiet before moving to the next step
    #[arg(long, default_value = "100")]
    pub quiet_ms: u64,
}

/// One printable line for an event.
pub fn format_event(event: &QueryEvent) -> String {
    match event {
        QueryEvent::Entered { document, location } => {
            format!("  entered  {} at {}", document.id(), location)
        }
        QueryEvent::Exited { document } => format!("  exited   {}", document.id()),
        QueryEvent::Moved { document, location } => {
            format!("  moved    {} to {}", document.id(), location)
        }
        QueryEvent::Changed { document, location } => {
            format!("  changed  {} at {}", document.id(), location)
        }
        QueryEvent::Ready => "  ready".to_string(),
        QueryEvent::Error(error) if error.is_fatal() => format!("  FATAL    {}", error),
        QueryEvent::Error(error) => format!("  error    {}", error),
    }
}

/// Print events until none arrive for `quiet`.
async fn print_until_quiet(rx: &mut mpsc::UnboundedReceiver<QueryEvent>, quiet: Duration) -> usize {
    let mut printed = 0;
    while let Ok(Some(event)) = tokio::time::timeout(quiet, rx.recv()).await {
        println!("{}", format_event(&event));
        printed += 1;
    }
    printed
}

/// Run the watch command.
pub fn run(args: WatchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let center = args.circle.center()?;
    let radius_km = args.circle.radius_km()?;
    let fixture = Fixture::load(&args.fixture)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let quiet = Duration::from_millis(args.quiet_ms);
    let query_config = config.query_config();

    runtime.block_on(async move {
        let store = Arc::new(MemoryStore::new());
        for document in &fixture.documents {
            store.set_document(document.to_snapshot());
        }
        info!(documents = store.document_count(), "Seeded in-memory store");

        let query = GeoQuery::builder(store.clone(), center, radius_km)
            .config(query_config)
            .start();
        let (listener, mut rx) = ChannelListener::new();
        query.add_listener(listener)?;

        println!("Query at {} radius {} km", query.center(), query.radius());
        print_until_quiet(&mut rx, quiet).await;

        for (index, step) in fixture.steps.iter().enumerate() {
            println!("Step {}: {}", index + 1, step);
            match step {
                Step::Set(document) => store.set_document(document.to_snapshot()),
                Step::Delete { id } => {
                    if store.remove_document(id).is_none() {
                        println!("  (no document '{}')", id);
                    }
                }
                Step::MoveQuery { center, radius_km } => {
                    let radius = radius_km.unwrap_or_else(|| query.radius());
                    query.set_location(*center, radius);
                }
            }
            print_until_quiet(&mut rx, quiet).await;
        }

        println!(
            "Done: {} document(s) cached, {} range(s) active",
            query.cached_document_count(),
            query.active_ranges().len()
        );
        Ok::<(), CliError>(())
    })
}
