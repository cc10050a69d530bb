//! Runtime counters for the bridge.
//!
//! Counters are bumped by the control loop and by the spawned reporter and
//! publisher tasks, and dumped periodically by the heartbeat task.

use core::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::gate::SkipReason;

/// Live counters.  Shared by reference between the loop and its tasks.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    snapshots: AtomicU64,
    malformed: AtomicU64,
    danger_entries: AtomicU64,
    danger_exits: AtomicU64,
    incidents_confirmed: AtomicU64,
    incidents_failed: AtomicU64,
    uploads_archived: AtomicU64,
    uploads_failed: AtomicU64,
    skipped_busy: AtomicU64,
    skipped_danger: AtomicU64,
}

/// Point-in-time copy of [`BridgeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub snapshots: u64,
    pub malformed: u64,
    pub danger_entries: u64,
    pub danger_exits: u64,
    pub incidents_confirmed: u64,
    pub incidents_failed: u64,
    pub uploads_archived: u64,
    pub uploads_failed: u64,
    pub skipped_busy: u64,
    pub skipped_danger: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_snapshot(&self) {
        bump(&self.snapshots);
    }

    pub fn record_malformed(&self) {
        bump(&self.malformed);
    }

    pub fn record_danger_entry(&self) {
        bump(&self.danger_entries);
    }

    pub fn record_danger_exit(&self) {
        bump(&self.danger_exits);
    }

    pub fn record_incident(&self, confirmed: bool) {
        if confirmed {
            bump(&self.incidents_confirmed);
        } else {
            bump(&self.incidents_failed);
        }
    }

    pub fn record_upload(&self, archived: bool) {
        if archived {
            bump(&self.uploads_archived);
        } else {
            bump(&self.uploads_failed);
        }
    }

    pub fn record_skip(&self, reason: SkipReason) {
        match reason {
            SkipReason::Busy => bump(&self.skipped_busy),
            SkipReason::Danger => bump(&self.skipped_danger),
        }
    }

    /// Collect all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            snapshots: load(&self.snapshots),
            malformed: load(&self.malformed),
            danger_entries: load(&self.danger_entries),
            danger_exits: load(&self.danger_exits),
            incidents_confirmed: load(&self.incidents_confirmed),
            incidents_failed: load(&self.incidents_failed),
            uploads_archived: load(&self.uploads_archived),
            uploads_failed: load(&self.uploads_failed),
            skipped_busy: load(&self.skipped_busy),
            skipped_danger: load(&self.skipped_danger),
        }
    }
}
