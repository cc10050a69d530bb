//! Mock port adapters for integration tests.
//!
//! Each mock records every call so tests can assert on the full history
//! without a node or a storage network.  Calls can be made to fail, or be
//! held pending until the test releases them.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use edge_executor::LocalExecutor;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use serde_json::Value;

use cngprotect::app::events::BridgeEvent;
use cngprotect::app::ports::{ArchiveError, ArchivePort, EventSink, LedgerError, LedgerPort};
use cngprotect::app::publisher::TelemetryPublisher;
use cngprotect::app::records::{Address, ContentRef, IncidentRecord, Receipt, TxHash};
use cngprotect::app::reporter::IncidentReporter;
use cngprotect::app::service::BridgeService;
use cngprotect::diagnostics::BridgeMetrics;

pub const SENDER: Address = Address::from_bytes([0x11; 20]);

type Release = Signal<CriticalSectionRawMutex, ()>;

// ── Ledger ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    SequenceNumber(Address),
    Submit { record: IncidentRecord, nonce: u64 },
    Confirm(TxHash),
}

pub struct LedgerState {
    pub calls: RefCell<Vec<LedgerCall>>,
    /// Next nonce the node would hand out.
    pub nonce: Cell<u64>,
    pub fail_submit: Cell<bool>,
    pub hold_confirm: Cell<bool>,
    release: Release,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            nonce: Cell::new(0),
            fail_submit: Cell::new(false),
            hold_confirm: Cell::new(false),
            release: Signal::new(),
        }
    }
}

/// Cheaply cloneable handle: the service owns one clone, the test another.
#[derive(Clone, Default)]
pub struct MockLedger(pub Rc<LedgerState>);

#[allow(dead_code)]
impl MockLedger {
    pub fn submissions(&self) -> Vec<(IncidentRecord, u64)> {
        self.0
            .calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                LedgerCall::Submit { record, nonce } => Some((record.clone(), *nonce)),
                _ => None,
            })
            .collect()
    }

    pub fn nonce_lookups(&self) -> usize {
        self.0
            .calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, LedgerCall::SequenceNumber(_)))
            .count()
    }

    /// Let one held confirmation complete.
    pub fn release_confirm(&self) {
        self.0.release.signal(());
    }
}

fn tx_hash(n: u64) -> TxHash {
    format!("0x{n:064x}").parse().unwrap()
}

impl LedgerPort for MockLedger {
    async fn sequence_number(&self, address: &Address) -> Result<u64, LedgerError> {
        self.0.calls.borrow_mut().push(LedgerCall::SequenceNumber(*address));
        Ok(self.0.nonce.get())
    }

    async fn submit_incident(&self, record: &IncidentRecord, nonce: u64) -> Result<TxHash, LedgerError> {
        self.0.calls.borrow_mut().push(LedgerCall::Submit {
            record: record.clone(),
            nonce,
        });
        if self.0.fail_submit.get() {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: "insufficient funds".into(),
            });
        }
        self.0.nonce.set(nonce + 1);
        Ok(tx_hash(nonce))
    }

    async fn wait_for_confirmation(&self, tx: &TxHash) -> Result<Receipt, LedgerError> {
        self.0.calls.borrow_mut().push(LedgerCall::Confirm(tx.clone()));
        if self.0.hold_confirm.get() {
            self.0.release.wait().await;
        }
        Ok(Receipt {
            tx: tx.clone(),
            block_number: 100,
        })
    }
}

// ── Archive ───────────────────────────────────────────────────

pub struct ArchiveState {
    /// Artifact contents as seen at upload time.
    pub uploads: RefCell<Vec<Value>>,
    pub in_flight: Cell<u32>,
    pub max_in_flight: Cell<u32>,
    pub fail: Cell<bool>,
    pub hold: Cell<bool>,
    release: Release,
}

impl Default for ArchiveState {
    fn default() -> Self {
        Self {
            uploads: RefCell::new(Vec::new()),
            in_flight: Cell::new(0),
            max_in_flight: Cell::new(0),
            fail: Cell::new(false),
            hold: Cell::new(false),
            release: Signal::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockArchive(pub Rc<ArchiveState>);

#[allow(dead_code)]
impl MockArchive {
    pub fn upload_count(&self) -> usize {
        self.0.uploads.borrow().len()
    }

    /// Let one held upload complete.
    pub fn release(&self) {
        self.0.release.signal(());
    }
}

impl ArchivePort for MockArchive {
    async fn upload(&self, artifact: &Path) -> Result<ContentRef, ArchiveError> {
        let bytes = std::fs::read(artifact).map_err(|e| ArchiveError::Artifact(e.to_string()))?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|_| ArchiveError::BadResponse("artifact is not JSON"))?;
        self.0.uploads.borrow_mut().push(value);

        let s = &self.0;
        s.in_flight.set(s.in_flight.get() + 1);
        s.max_in_flight.set(s.max_in_flight.get().max(s.in_flight.get()));
        if s.hold.get() {
            s.release.wait().await;
        }
        s.in_flight.set(s.in_flight.get() - 1);

        if s.fail.get() {
            return Err(ArchiveError::Transport("connection reset".into()));
        }
        Ok(ContentRef(format!("0xroot{}", s.uploads.borrow().len())))
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: RefCell<Vec<BridgeEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&BridgeEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &BridgeEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type Executor = LocalExecutor<'static, 64>;
pub type TestService = BridgeService<MockLedger, MockArchive, RecordingSink>;

pub struct Harness {
    pub executor: &'static Executor,
    pub service: Rc<TestService>,
    pub ledger: MockLedger,
    pub archive: MockArchive,
    pub sink: Rc<RecordingSink>,
    pub metrics: Rc<BridgeMetrics>,
    _dir: tempfile::TempDir,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ledger = MockLedger::default();
        let archive = MockArchive::default();
        let sink = Rc::new(RecordingSink::default());
        let metrics = Rc::new(BridgeMetrics::new());
        let service = Rc::new(BridgeService::new(
            "Device_01",
            IncidentReporter::new(ledger.clone(), SENDER),
            TelemetryPublisher::new(archive.clone(), dir.path().join("temp_log.json")),
            Rc::clone(&sink),
            Rc::clone(&metrics),
        ));
        Self {
            executor: Box::leak(Box::new(LocalExecutor::new())),
            service,
            ledger,
            archive,
            sink,
            metrics,
            _dir: dir,
        }
    }

    /// Deliver one update and run every task until nothing is runnable.
    pub fn push(&self, value: Value) {
        self.service.handle_update(&value, self.executor);
        self.settle();
    }

    pub fn settle(&self) {
        while self.executor.try_tick() {}
    }
}
