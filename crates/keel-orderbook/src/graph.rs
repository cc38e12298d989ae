use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};

use keel_types::OfferEntry;

use crate::error::{OrderBookError, OrderBookResult};
use crate::snapshot::OrderBookSnapshot;

/// A queued graph mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphOperation {
    Add(OfferEntry),
    Remove(i64),
}

/// Writer-side view of an offer graph.
///
/// Mutations are queued and only become visible to readers when `apply`
/// succeeds. A failed `apply` drops the queue and leaves the published state
/// untouched.
pub trait OfferGraph: Send + Sync {
    /// Queue an insert-or-replace keyed by offer id.
    fn add_offer(&self, offer: OfferEntry);

    /// Queue a removal by offer id.
    fn remove_offer(&self, offer_id: i64);

    /// Apply every queued operation and tag the result with `ledger`.
    fn apply(&self, ledger: u32) -> OrderBookResult<()>;

    /// Drop queued operations without applying them.
    fn discard(&self);

    /// Reset to an empty graph at ledger zero, dropping queued operations.
    fn clear(&self);

    /// Offers as of the last successful `apply`, sorted by id.
    fn offers(&self) -> Vec<OfferEntry>;

    /// Ledger of the last successful `apply`, zero if none.
    fn last_ledger(&self) -> u32;
}

/// Process-wide offer graph with one writer and any number of readers.
///
/// The writer queues operations under a mutex. `apply` builds the next
/// snapshot from a copy of the current one and publishes it with a single
/// pointer swap, so a reader holding an `Arc<OrderBookSnapshot>` always sees
/// a whole ledger.
pub struct OrderBookGraph {
    pending: Mutex<Vec<GraphOperation>>,
    current: RwLock<Arc<OrderBookSnapshot>>,
}

impl OrderBookGraph {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            current: RwLock::new(Arc::new(OrderBookSnapshot::default())),
        }
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<OrderBookSnapshot> {
        Arc::clone(&self.current.read().expect("orderbook lock poisoned"))
    }

    /// Number of queued, unapplied operations.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("orderbook lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn enqueue(&self, op: GraphOperation) {
        self.pending
            .lock()
            .expect("orderbook lock poisoned")
            .push(op);
    }
}

impl Default for OrderBookGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl OfferGraph for OrderBookGraph {
    fn add_offer(&self, offer: OfferEntry) {
        self.enqueue(GraphOperation::Add(offer));
    }

    fn remove_offer(&self, offer_id: i64) {
        self.enqueue(GraphOperation::Remove(offer_id));
    }

    fn apply(&self, ledger: u32) -> OrderBookResult<()> {
        // Held for the whole apply so writers stay serialized.
        let mut pending = self.pending.lock().expect("orderbook lock poisoned");
        let ops = std::mem::take(&mut *pending);
        let current = self.snapshot();

        let last = current.ledger();
        if last != 0 && ledger <= last {
            warn!(last, ledger, "rejecting non-advancing ledger");
            return Err(OrderBookError::UnexpectedLedger { last, ledger });
        }

        let mut next = OrderBookSnapshot::clone(&current);
        for op in &ops {
            match op {
                GraphOperation::Add(offer) => next.add(offer.clone()),
                GraphOperation::Remove(offer_id) => next.remove(*offer_id)?,
            }
        }
        next.set_ledger(ledger);

        debug!(
            ledger,
            operations = ops.len(),
            offers = next.len(),
            "order book graph applied"
        );
        *self.current.write().expect("orderbook lock poisoned") = Arc::new(next);
        Ok(())
    }

    fn discard(&self) {
        let dropped = std::mem::take(&mut *self.pending.lock().expect("orderbook lock poisoned"));
        if !dropped.is_empty() {
            debug!(operations = dropped.len(), "discarded queued graph operations");
        }
    }

    fn clear(&self) {
        let mut pending = self.pending.lock().expect("orderbook lock poisoned");
        pending.clear();
        *self.current.write().expect("orderbook lock poisoned") =
            Arc::new(OrderBookSnapshot::default());
        debug!("order book graph cleared");
    }

    fn offers(&self) -> Vec<OfferEntry> {
        self.snapshot().offers()
    }

    fn last_ledger(&self) -> u32 {
        self.snapshot().ledger()
    }
}

impl std::fmt::Debug for OrderBookGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("OrderBookGraph")
            .field("ledger", &snapshot.ledger())
            .field("offer_count", &snapshot.len())
            .field("pending", &self.pending_len())
            .finish()
    }
}
