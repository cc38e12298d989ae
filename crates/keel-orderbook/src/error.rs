/// Errors from applying a batch of graph updates.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrderBookError {
    #[error("offer {0} is not present in the order book graph")]
    OfferNotPresent(i64),

    #[error("cannot apply ledger {ledger}: graph already reflects ledger {last}")]
    UnexpectedLedger { last: u32, ledger: u32 },
}

pub type OrderBookResult<T> = Result<T, OrderBookError>;
