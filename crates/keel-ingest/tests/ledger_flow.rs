use std::sync::{Arc, Mutex};

use keel_ingest::{CancelToken, HistoryStores, IngestConfig, IngestError, LedgerRunner, ProcessingMode};
use keel_orderbook::{OfferGraph, OrderBookGraph, OrderBookResult};
use keel_store::{
    AssetStatKey, AssetStatTable, EntryTable, InMemoryAssetStatTable, InMemoryEntryTable,
    InMemorySignerTable,
};
use keel_types::{
    AccountEntry, Asset, Change, ChangeType, EntryData, EntryKind, LedgerEntry, LedgerHeader,
    OfferEntry, Price, Signer, TrustLineEntry,
};
use num_bigint::BigInt;

const ISSUER: &str = "GISSUER";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn usd() -> Asset {
    Asset::credit("USD", ISSUER).unwrap()
}

fn account(id: &str, balance: i64) -> LedgerEntry {
    LedgerEntry::new(1, EntryData::Account(AccountEntry::new(id, balance)))
}

fn offer(id: i64, n: i32, d: i32) -> LedgerEntry {
    LedgerEntry::new(
        1,
        EntryData::Offer(OfferEntry {
            seller_id: "GSELLER".into(),
            offer_id: id,
            selling: Asset::Native,
            buying: usd(),
            amount: 500,
            price: Price::new(n, d).unwrap(),
            flags: 0,
        }),
    )
}

fn trust_line(account_id: &str, balance: i64) -> LedgerEntry {
    LedgerEntry::new(
        1,
        EntryData::TrustLine(TrustLineEntry {
            account_id: account_id.into(),
            asset: usd(),
            balance,
            limit: i64::MAX,
            flags: 0,
        }),
    )
}

/// Offer graph that records every call before delegating.
#[derive(Default)]
struct RecordingGraph {
    inner: OrderBookGraph,
    calls: Mutex<Vec<String>>,
}

impl RecordingGraph {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl OfferGraph for RecordingGraph {
    fn add_offer(&self, offer: OfferEntry) {
        self.record(format!("add {} {}", offer.offer_id, offer.price));
        self.inner.add_offer(offer);
    }

    fn remove_offer(&self, offer_id: i64) {
        self.record(format!("remove {offer_id}"));
        self.inner.remove_offer(offer_id);
    }

    fn apply(&self, ledger: u32) -> OrderBookResult<()> {
        self.inner.apply(ledger)
    }

    fn discard(&self) {
        self.inner.discard();
    }

    fn clear(&self) {
        self.inner.clear();
    }

    fn offers(&self) -> Vec<OfferEntry> {
        self.inner.offers()
    }

    fn last_ledger(&self) -> u32 {
        self.inner.last_ledger()
    }
}

struct Harness {
    accounts: Arc<InMemoryEntryTable>,
    offers: Arc<InMemoryEntryTable>,
    trust_lines: Arc<InMemoryEntryTable>,
    signers: Arc<InMemorySignerTable>,
    stats: Arc<InMemoryAssetStatTable>,
    graph: Arc<RecordingGraph>,
    runner: LedgerRunner,
}

fn harness(config: IngestConfig) -> Harness {
    init_tracing();
    let accounts = Arc::new(InMemoryEntryTable::new(EntryKind::Account));
    let offers = Arc::new(InMemoryEntryTable::new(EntryKind::Offer));
    let trust_lines = Arc::new(InMemoryEntryTable::new(EntryKind::TrustLine));
    let signers = Arc::new(InMemorySignerTable::new());
    let stats = Arc::new(InMemoryAssetStatTable::new());
    let graph = Arc::new(RecordingGraph::default());

    let stores = HistoryStores::new()
        .with_entry_table(accounts.clone())
        .with_entry_table(offers.clone())
        .with_entry_table(trust_lines.clone())
        .with_signers(signers.clone())
        .with_asset_stats(stats.clone());
    let runner = LedgerRunner::new(stores, graph.clone(), config).unwrap();

    Harness {
        accounts,
        offers,
        trust_lines,
        signers,
        stats,
        graph,
        runner,
    }
}

fn incremental(h: &mut Harness, sequence: u32, changes: Vec<Change>) -> Result<(), IngestError> {
    h.runner
        .run_ledger(
            &LedgerHeader::new(sequence),
            ProcessingMode::Incremental,
            changes,
            &CancelToken::new(),
        )
        .map(|_| ())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn offer_created_updated_removed_in_one_ledger() {
    let mut h = harness(IngestConfig::default());
    let changes = vec![
        Change::created(offer(7, 1, 2)),
        Change::updated(offer(7, 1, 2), offer(7, 1, 6)).unwrap(),
        Change::removed(offer(7, 1, 6)),
    ];
    incremental(&mut h, 10, changes).unwrap();

    // the cached processor coalesced to nothing
    assert_eq!(h.offers.write_calls(), 0);
    // the graph saw every change, in order
    assert_eq!(h.graph.calls(), vec!["add 7 1/2", "add 7 1/6", "remove 7"]);
    assert!(h.graph.offers().iter().all(|o| o.offer_id != 7));
    assert_eq!(h.graph.last_ledger(), 10);
    assert_eq!(h.runner.last_committed(), Some(10));
}

#[test]
fn update_of_unknown_row_halts_ingestion() {
    let mut h = harness(IngestConfig::default());
    let changes = vec![
        Change::created(offer(1, 1, 2)),
        Change::updated(account("GA", 1), account("GA", 2)).unwrap(),
    ];
    let err = incremental(&mut h, 10, changes).unwrap_err();

    assert!(err.is_fatal());
    assert!(!err.is_retryable());
    assert_eq!(h.runner.last_committed(), None);
    // queued graph work was dropped with the ledger
    assert!(h.graph.offers().is_empty());
    assert_eq!(h.graph.last_ledger(), 0);
    h.graph.apply(10).unwrap();
    assert!(h.graph.offers().is_empty());
}

#[test]
fn ledgers_must_be_consecutive() {
    let mut h = harness(IngestConfig::default());
    incremental(&mut h, 10, vec![Change::created(account("GA", 1))]).unwrap();

    let err = incremental(&mut h, 12, vec![]).unwrap_err();
    assert!(matches!(
        err,
        IngestError::OutOfOrder {
            expected: 11,
            actual: 12
        }
    ));
    incremental(&mut h, 11, vec![]).unwrap();
    assert_eq!(h.runner.last_committed(), Some(11));
}

#[test]
fn cancelled_run_commits_nothing() {
    let mut h = harness(IngestConfig::default());
    let cancel = CancelToken::new();
    let token = cancel.clone();

    // cancel after the first change has been read
    let changes = vec![
        Change::created(account("GA", 1)),
        Change::created(offer(1, 1, 2)),
    ]
    .into_iter()
    .enumerate()
    .map(move |(i, change)| {
        if i == 0 {
            token.cancel();
        }
        change
    });

    let err = h
        .runner
        .run_ledger(
            &LedgerHeader::new(5),
            ProcessingMode::Incremental,
            changes,
            &cancel,
        )
        .unwrap_err();
    assert!(matches!(err, IngestError::Cancelled));
    assert_eq!(h.accounts.write_calls(), 0);
    assert_eq!(h.runner.last_committed(), None);
    assert!(h.graph.offers().is_empty());
}

#[test]
fn transient_failure_can_be_replayed() {
    let mut h = harness(IngestConfig::default());
    let changes = || vec![Change::created(account("GA", 1)), Change::created(offer(3, 1, 2))];

    h.accounts.set_unavailable(true);
    let err = incremental(&mut h, 20, changes()).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.runner.last_committed(), None);

    h.accounts.set_unavailable(false);
    incremental(&mut h, 20, changes()).unwrap();
    assert_eq!(h.accounts.len(), 1);
    assert_eq!(h.offers.len(), 1);
    assert_eq!(h.graph.offers().len(), 1);
}

#[test]
fn bootstrap_then_incremental() {
    let mut h = harness(IngestConfig {
        max_batch_size: 2,
        ..IngestConfig::default()
    });

    let mut multisig = AccountEntry::new("GB", 50);
    multisig.signers.push(Signer {
        key: "GSIGNER".into(),
        weight: 3,
    });
    let bootstrap = vec![
        Change::created(account("GA", 100)),
        Change::created(LedgerEntry::new(1, EntryData::Account(multisig))),
        Change::created(trust_line("GA", 40)),
        Change::created(trust_line("GB", 60)),
        Change::created(offer(1, 1, 2)),
        Change::created(offer(2, 1, 3)),
    ];
    let stats = h
        .runner
        .run_ledger(
            &LedgerHeader::new(100),
            ProcessingMode::Bootstrap,
            bootstrap,
            &CancelToken::new(),
        )
        .unwrap();
    assert_eq!(stats.get(EntryKind::Account, ChangeType::Created), 2);
    assert_eq!(h.accounts.len(), 2);
    assert_eq!(h.trust_lines.len(), 2);
    assert_eq!(h.offers.len(), 2);
    assert_eq!(h.signers.len(), 3);
    assert_eq!(h.graph.offers().len(), 2);

    let key = AssetStatKey::from_asset(&usd());
    let stat = h.stats.get_stat(&key).unwrap().unwrap();
    assert_eq!(stat.amount, BigInt::from(100));
    assert_eq!(stat.num_accounts, 2);

    let ledger = vec![
        Change::updated(trust_line("GA", 40), trust_line("GA", 45)).unwrap(),
        Change::removed(trust_line("GB", 60)),
        Change::removed(offer(2, 1, 3)),
        Change::updated(account("GA", 100), account("GA", 90)).unwrap(),
    ];
    incremental(&mut h, 101, ledger).unwrap();

    let stat = h.stats.get_stat(&key).unwrap().unwrap();
    assert_eq!(stat.amount, BigInt::from(45));
    assert_eq!(stat.num_accounts, 1);
    assert_eq!(h.trust_lines.len(), 1);
    assert_eq!(h.offers.count().unwrap(), 1);
    let row = h.accounts.get(&account("GA", 0).key()).unwrap();
    assert_eq!(row.ledger, 101);
    assert_eq!(row.entry.as_account().unwrap().balance, 90);
    // balance-only update leaves signers alone
    assert_eq!(h.signers.len(), 3);
    let offers = h.graph.offers();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].offer_id, 1);
    assert_eq!(h.graph.last_ledger(), 101);
}

#[test]
fn bootstrap_rejects_non_created_changes() {
    let mut h = harness(IngestConfig::default());
    let err = h
        .runner
        .run_ledger(
            &LedgerHeader::new(1),
            ProcessingMode::Bootstrap,
            vec![Change::removed(account("GA", 1))],
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn invalid_config_is_rejected() {
    let stores = HistoryStores::new();
    let graph = Arc::new(OrderBookGraph::new());
    let err = LedgerRunner::new(
        stores,
        graph,
        IngestConfig {
            flush_threshold: 0,
            ..IngestConfig::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, IngestError::Config(_)));
}
