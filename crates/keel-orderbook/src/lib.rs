//! In-memory offer graph for keel.
//!
//! The graph is a derived index over open offers, rebuilt at startup from a
//! bootstrap pass and then kept current ledger by ledger. One ingestion
//! writer queues [`GraphOperation`]s and publishes them with
//! [`OfferGraph::apply`]; any number of readers take an
//! [`OrderBookSnapshot`] and query it without blocking the writer.
//!
//! Snapshots are never mutated after publication, so a reader sees either
//! the whole of a ledger's updates or none of them.

pub mod error;
pub mod graph;
pub mod snapshot;

pub use error::{OrderBookError, OrderBookResult};
pub use graph::{GraphOperation, OfferGraph, OrderBookGraph};
pub use snapshot::{AsksAndBids, OrderBookSnapshot};
