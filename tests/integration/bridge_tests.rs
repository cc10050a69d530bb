//! End-to-end tests for the BridgeService control loop.
//!
//! Updates are fed straight into `handle_update` (or through a channel for
//! the `run` loop) and the executor is ticked until idle, so every spawned
//! reporter and publisher has either finished or is parked on a held mock.

use std::rc::Rc;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use serde_json::{Value, json};

use cngprotect::Error;
use cngprotect::app::events::BridgeEvent;
use cngprotect::app::ports::{ArchiveError, LedgerError};
use cngprotect::events::FeedEvent;
use cngprotect::gate::SkipReason;

use crate::mock_ports::{Harness, LedgerCall, SENDER};

fn safe(gas: f64) -> Value {
    json!({ "is_danger": false, "gas_level": gas })
}

fn danger(gas: f64) -> Value {
    json!({ "is_danger": true, "gas_level": gas })
}

// ── QA-1: safe stream archives every snapshot ─────────────────

#[test]
fn safe_snapshot_is_archived_and_gate_released() {
    let h = Harness::new();
    h.push(safe(120.0));

    assert_eq!(h.archive.upload_count(), 1);
    assert_eq!(h.archive.0.uploads.borrow()[0]["is_danger"], false);
    assert_eq!(h.archive.0.uploads.borrow()[0]["gas_level"], 120.0);
    assert!(!h.service.is_uploading());
    assert_eq!(h.sink.count(|e| matches!(e, BridgeEvent::TelemetryArchived(_))), 1);
    assert!(h.ledger.submissions().is_empty());
}

#[test]
fn extra_fields_are_archived_verbatim() {
    let h = Harness::new();
    h.push(json!({ "is_danger": false, "gas_level": 80, "temperature": 31.5, "ts": 1700000000 }));

    let uploads = h.archive.0.uploads.borrow();
    assert_eq!(uploads[0]["temperature"], 31.5);
    assert_eq!(uploads[0]["ts"], 1700000000);
}

#[test]
fn uploaded_artifact_equals_the_pushed_payload() {
    let h = Harness::new();
    let pushed = json!({ "is_danger": false, "gas_level": 512, "rssi": -61, "fw": "1.4.0" });
    h.push(pushed.clone());

    let uploads = h.archive.0.uploads.borrow();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0], pushed);
    assert!(uploads[0]["gas_level"].is_u64());
}

// ── QA-2: entering danger reports exactly once ────────────────

#[test]
fn danger_edge_reports_once_and_suspends_archival() {
    let h = Harness::new();
    h.push(safe(100.0));
    h.push(danger(612.4));
    h.push(danger(700.0));
    h.push(danger(650.0));

    let subs = h.ledger.submissions();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].0.device_id, "Device_01");
    assert_eq!(subs[0].0.gas_level, 612);
    assert!(h.service.in_danger());

    // Only the first safe snapshot was archived.
    assert_eq!(h.archive.upload_count(), 1);
    assert_eq!(
        h.sink.count(|e| matches!(e, BridgeEvent::UploadSkipped(SkipReason::Danger))),
        3
    );
    assert_eq!(h.sink.count(|e| matches!(e, BridgeEvent::IncidentConfirmed(_))), 1);
}

#[test]
fn nonce_is_fetched_for_the_configured_sender() {
    let h = Harness::new();
    h.push(danger(500.0));

    let calls = h.ledger.0.calls.borrow();
    assert_eq!(calls[0], LedgerCall::SequenceNumber(SENDER));
}

#[test]
fn mixed_sequence_reports_once_and_archives_only_safe_ends() {
    let h = Harness::new();
    for v in [safe(10.0), danger(500.0), danger(520.0), safe(8.0)] {
        h.push(v);
    }

    assert_eq!(h.ledger.submissions().len(), 1);
    assert_eq!(h.ledger.submissions()[0].0.gas_level, 500);
    let gas: Vec<Value> = h
        .archive
        .0
        .uploads
        .borrow()
        .iter()
        .map(|u| u["gas_level"].clone())
        .collect();
    assert_eq!(gas, vec![json!(10.0), json!(8.0)]);
}

// ── QA-3: leaving danger resumes archival ─────────────────────

#[test]
fn exit_from_danger_resumes_archival() {
    let h = Harness::new();
    h.push(danger(500.0));
    h.push(safe(90.0));

    assert!(!h.service.in_danger());
    assert_eq!(h.sink.count(|e| matches!(e, BridgeEvent::ExitedDanger { .. })), 1);
    assert_eq!(h.archive.upload_count(), 1);
    assert_eq!(h.archive.0.uploads.borrow()[0]["is_danger"], false);
}

#[test]
fn every_edge_uses_a_fresh_nonce() {
    let h = Harness::new();
    h.ledger.0.nonce.set(41);
    for _ in 0..3 {
        h.push(danger(500.0));
        h.push(safe(50.0));
    }

    let nonces: Vec<u64> = h.ledger.submissions().iter().map(|(_, n)| *n).collect();
    assert_eq!(nonces, vec![41, 42, 43]);
    assert_eq!(h.ledger.nonce_lookups(), 3);
}

// ── QA-4: single upload in flight ─────────────────────────────

#[test]
fn busy_gate_skips_snapshots_until_upload_completes() {
    let h = Harness::new();
    h.archive.0.hold.set(true);

    h.push(safe(10.0));
    assert!(h.service.is_uploading());
    h.push(safe(11.0));
    h.push(safe(12.0));
    assert_eq!(h.archive.upload_count(), 1);
    assert_eq!(
        h.sink.count(|e| matches!(e, BridgeEvent::UploadSkipped(SkipReason::Busy))),
        2
    );

    h.archive.0.hold.set(false);
    h.archive.release();
    h.settle();
    assert!(!h.service.is_uploading());

    h.push(safe(13.0));
    assert_eq!(h.archive.upload_count(), 2);
    assert_eq!(h.archive.0.max_in_flight.get(), 1);
}

#[test]
fn danger_during_upload_is_still_reported() {
    let h = Harness::new();
    h.archive.0.hold.set(true);

    h.push(safe(10.0));
    h.push(danger(800.0));

    assert_eq!(h.ledger.submissions().len(), 1);
    // The in-flight upload is not cancelled.
    assert!(h.service.is_uploading());

    h.archive.release();
    h.settle();
    assert!(!h.service.is_uploading());
    assert_eq!(h.archive.upload_count(), 1);
}

// ── QA-5: failures are reported, not retried ──────────────────

#[test]
fn failed_upload_releases_gate() {
    let h = Harness::new();
    h.archive.0.fail.set(true);
    h.push(safe(10.0));

    assert!(!h.service.is_uploading());
    let failed = h.sink.count(|e| {
        matches!(e, BridgeEvent::ArchiveFailed(Error::Archive(ArchiveError::Transport(_))))
    });
    assert_eq!(failed, 1);

    h.archive.0.fail.set(false);
    h.push(safe(11.0));
    assert_eq!(h.archive.upload_count(), 2);
    assert_eq!(h.metrics.snapshot().uploads_failed, 1);
    assert_eq!(h.metrics.snapshot().uploads_archived, 1);
}

#[test]
fn failed_report_keeps_danger_and_is_not_retried() {
    let h = Harness::new();
    h.ledger.0.fail_submit.set(true);
    h.push(danger(500.0));
    h.push(danger(510.0));

    assert!(h.service.in_danger());
    assert_eq!(h.ledger.submissions().len(), 1);
    let failed = h.sink.count(|e| {
        matches!(e, BridgeEvent::IncidentFailed(Error::Ledger(LedgerError::Rpc { .. })))
    });
    assert_eq!(failed, 1);
    assert_eq!(h.metrics.snapshot().incidents_failed, 1);
}

#[test]
fn ledger_failure_does_not_stop_the_exit_transition() {
    let h = Harness::new();
    h.ledger.0.fail_submit.set(true);
    h.push(danger(500.0));
    h.push(safe(8.0));

    assert!(!h.service.in_danger());
    assert_eq!(h.sink.count(|e| matches!(e, BridgeEvent::ExitedDanger { .. })), 1);
    assert_eq!(h.archive.upload_count(), 1);
}

#[test]
fn negative_gas_level_fails_the_report_without_a_transaction() {
    let h = Harness::new();
    h.push(danger(-3.0));

    assert!(h.service.in_danger());
    assert_eq!(h.ledger.nonce_lookups(), 0);
    assert_eq!(
        h.sink.count(|e| matches!(
            e,
            BridgeEvent::IncidentFailed(Error::Ledger(LedgerError::InvalidRecord(_)))
        )),
        1
    );
}

#[test]
fn slow_confirmation_does_not_block_the_loop() {
    let h = Harness::new();
    h.ledger.0.hold_confirm.set(true);
    h.push(danger(500.0));
    h.push(safe(20.0));

    // Exit was observed and archival resumed while the receipt is pending.
    assert!(!h.service.in_danger());
    assert_eq!(h.archive.upload_count(), 1);
    assert_eq!(h.sink.count(|e| matches!(e, BridgeEvent::IncidentConfirmed(_))), 0);

    h.ledger.release_confirm();
    h.settle();
    assert_eq!(h.sink.count(|e| matches!(e, BridgeEvent::IncidentConfirmed(_))), 1);
}

// ── QA-6: malformed input is a no-op ──────────────────────────

#[test]
fn malformed_snapshots_change_nothing() {
    let h = Harness::new();
    h.push(danger(500.0));
    for bad in [
        Value::Null,
        json!("text"),
        json!({ "gas_level": 12 }),
        json!({ "is_danger": "no", "gas_level": 12 }),
        json!({ "is_danger": false, "gas_level": "high" }),
    ] {
        h.push(bad);
    }

    assert!(h.service.in_danger());
    assert_eq!(h.archive.upload_count(), 0);
    assert_eq!(h.sink.count(|e| matches!(e, BridgeEvent::MalformedSnapshot)), 5);
    assert_eq!(h.metrics.snapshot().malformed, 5);
    assert_eq!(h.metrics.snapshot().snapshots, 1);
}

// ── QA-7: run loop over a channel ─────────────────────────────

#[test]
fn run_consumes_channel_until_closed() {
    let h = Harness::new();
    let feed: Rc<Channel<CriticalSectionRawMutex, FeedEvent, 8>> = Rc::new(Channel::new());
    for v in [safe(1.0), danger(600.0), safe(2.0)] {
        feed.try_send(FeedEvent::Update(v)).unwrap();
    }
    feed.try_send(FeedEvent::Closed).unwrap();

    let svc = Rc::clone(&h.service);
    let source = Rc::clone(&feed);
    let executor = h.executor;
    let task = h
        .executor
        .spawn(async move { svc.run(&*source, executor).await });
    h.settle();

    assert!(task.is_finished());
    let events = h.sink.events.borrow();
    assert!(matches!(&events[0], BridgeEvent::Started { device_id } if device_id == "Device_01"));
    drop(events);
    assert_eq!(h.ledger.submissions().len(), 1);
    assert_eq!(h.archive.upload_count(), 2);
}

#[test]
fn heartbeat_emits_metrics_periodically() {
    let h = Harness::new();
    h.push(safe(1.0));

    let svc = Rc::clone(&h.service);
    futures_lite::future::block_on(futures_lite::future::or(
        async move { svc.heartbeat(Duration::from_millis(10)).await },
        async {
            async_io_mini::Timer::after(Duration::from_millis(55)).await;
        },
    ));

    let beats = h.sink.count(|e| matches!(e, BridgeEvent::Heartbeat(m) if m.snapshots == 1));
    assert!(beats >= 2, "expected at least two heartbeats, got {beats}");
}
