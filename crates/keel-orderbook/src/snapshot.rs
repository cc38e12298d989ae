use std::collections::BTreeMap;

use keel_types::{Asset, OfferEntry};

use crate::error::{OrderBookError, OrderBookResult};

/// Offers on both sides of one trading pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AsksAndBids {
    /// Offers selling the base asset for the counter asset, cheapest first.
    pub asks: Vec<OfferEntry>,
    /// Offers selling the counter asset for the base asset, cheapest first.
    pub bids: Vec<OfferEntry>,
    /// Ledger the lookup reflects.
    pub ledger: u32,
}

/// Immutable view of the offer set as of one ledger.
///
/// Offers are indexed by id and by (selling, buying) pair. Within a pair the
/// offers are kept sorted by price, then by id.
#[derive(Clone, Debug, Default)]
pub struct OrderBookSnapshot {
    ledger: u32,
    offers: BTreeMap<i64, OfferEntry>,
    edges: BTreeMap<(Asset, Asset), Vec<OfferEntry>>,
}

impl OrderBookSnapshot {
    /// Ledger this snapshot reflects. Zero means nothing has been applied.
    pub fn ledger(&self) -> u32 {
        self.ledger
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn offer(&self, offer_id: i64) -> Option<&OfferEntry> {
        self.offers.get(&offer_id)
    }

    /// All offers, sorted by id.
    pub fn offers(&self) -> Vec<OfferEntry> {
        self.offers.values().cloned().collect()
    }

    /// Asks and bids for a trading pair, each spanning at most
    /// `max_price_levels` distinct prices.
    pub fn find_asks_and_bids(
        &self,
        selling: &Asset,
        buying: &Asset,
        max_price_levels: usize,
    ) -> AsksAndBids {
        AsksAndBids {
            asks: self.find_offers(selling, buying, max_price_levels),
            bids: self.find_offers(buying, selling, max_price_levels),
            ledger: self.ledger,
        }
    }

    fn find_offers(&self, selling: &Asset, buying: &Asset, max_price_levels: usize) -> Vec<OfferEntry> {
        let Some(edge) = self.edges.get(&(selling.clone(), buying.clone())) else {
            return Vec::new();
        };
        let mut levels = 0;
        let mut results: Vec<OfferEntry> = Vec::new();
        for offer in edge {
            let new_level = results.last().map_or(true, |last| last.price != offer.price);
            if new_level {
                if levels == max_price_levels {
                    break;
                }
                levels += 1;
            }
            results.push(offer.clone());
        }
        results
    }

    /// Insert or replace an offer.
    pub(crate) fn add(&mut self, offer: OfferEntry) {
        if self.offers.contains_key(&offer.offer_id) {
            // Present in both indexes, so removal cannot fail.
            let _ = self.remove(offer.offer_id);
        }
        let edge = self
            .edges
            .entry((offer.selling.clone(), offer.buying.clone()))
            .or_default();
        let at = edge.partition_point(|o| (o.price, o.offer_id) < (offer.price, offer.offer_id));
        edge.insert(at, offer.clone());
        self.offers.insert(offer.offer_id, offer);
    }

    pub(crate) fn remove(&mut self, offer_id: i64) -> OrderBookResult<()> {
        let offer = self
            .offers
            .remove(&offer_id)
            .ok_or(OrderBookError::OfferNotPresent(offer_id))?;
        let pair = (offer.selling, offer.buying);
        let edge = self
            .edges
            .get_mut(&pair)
            .ok_or(OrderBookError::OfferNotPresent(offer_id))?;
        let before = edge.len();
        edge.retain(|o| o.offer_id != offer_id);
        if edge.len() == before {
            return Err(OrderBookError::OfferNotPresent(offer_id));
        }
        if edge.is_empty() {
            self.edges.remove(&pair);
        }
        Ok(())
    }

    pub(crate) fn set_ledger(&mut self, ledger: u32) {
        self.ledger = ledger;
    }
}
