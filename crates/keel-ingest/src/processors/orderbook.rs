use std::sync::Arc;

use keel_orderbook::OfferGraph;
use keel_types::{Change, EntryData, EntryKind, LedgerEntry, OfferEntry};

use crate::error::{IngestError, Result};
use crate::processors::ChangeProcessor;

/// Feeds offer changes straight into the shared offer graph.
///
/// The graph replaces offers by id, so nothing is coalesced here: every
/// change becomes one queued graph operation, in arrival order. Nothing is
/// persisted and `commit` does nothing; the caller publishes the queued
/// operations with [`OfferGraph::apply`] once the ledger has committed.
/// The same processor serves bootstrap and incremental runs.
pub struct OrderBookProcessor {
    graph: Arc<dyn OfferGraph>,
    queued: usize,
}

impl OrderBookProcessor {
    pub fn new(graph: Arc<dyn OfferGraph>) -> Self {
        Self { graph, queued: 0 }
    }

    /// Graph operations queued by this processor.
    pub fn queued(&self) -> usize {
        self.queued
    }
}

fn offer_of(entry: LedgerEntry) -> Result<OfferEntry> {
    match entry.data {
        EntryData::Offer(offer) => Ok(offer),
        other => Err(IngestError::state(format!(
            "offer change carries a {} entry",
            other.kind()
        ))),
    }
}

impl ChangeProcessor for OrderBookProcessor {
    fn name(&self) -> &str {
        "orderbook"
    }

    fn process_change(&mut self, change: Change) -> Result<()> {
        if change.kind != EntryKind::Offer {
            return Ok(());
        }
        match (change.before, change.after) {
            (_, Some(after)) => self.graph.add_offer(offer_of(after)?),
            (Some(before), None) => self.graph.remove_offer(offer_of(before)?.offer_id),
            (None, None) => {
                return Err(IngestError::state(
                    "offer change has neither before nor after",
                ))
            }
        }
        self.queued += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_orderbook::OrderBookGraph;
    use keel_types::{Asset, Price};

    fn offer(id: i64, n: i32, d: i32) -> LedgerEntry {
        LedgerEntry::new(
            1,
            EntryData::Offer(OfferEntry {
                seller_id: "GSELLER".into(),
                offer_id: id,
                selling: Asset::Native,
                buying: Asset::credit("USD", "GISSUER").unwrap(),
                amount: 10,
                price: Price::new(n, d).unwrap(),
                flags: 0,
            }),
        )
    }

    #[test]
    fn every_change_reaches_the_graph() {
        let graph = Arc::new(OrderBookGraph::new());
        let mut processor = OrderBookProcessor::new(graph.clone());
        processor.process_change(Change::created(offer(1, 1, 2))).unwrap();
        processor
            .process_change(Change::updated(offer(1, 1, 2), offer(1, 1, 6)).unwrap())
            .unwrap();
        processor.process_change(Change::created(offer(2, 1, 3))).unwrap();
        processor.commit().unwrap();

        assert_eq!(processor.queued(), 3);
        assert_eq!(graph.pending_len(), 3);
        assert!(graph.offers().is_empty());

        graph.apply(4).unwrap();
        let offers = graph.offers();
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].price, Price::new(1, 6).unwrap());
    }

    #[test]
    fn empty_change_is_fatal() {
        let graph = Arc::new(OrderBookGraph::new());
        let mut processor = OrderBookProcessor::new(graph);
        let err = processor
            .process_change(Change {
                kind: EntryKind::Offer,
                before: None,
                after: None,
            })
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
