//! Outbound bridge events.
//!
//! The [`BridgeService`](super::service::BridgeService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to the console, forward to a
//! supervisor, or record them in a test.

use crate::app::records::{ContentRef, Receipt};
use crate::diagnostics::MetricsSnapshot;
use crate::error::Error;
use crate::gate::SkipReason;

/// Structured events emitted by the bridge core.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// The control loop is listening (carries the device identifier).
    Started { device_id: String },

    /// Safe → Danger edge.  An incident report has been dispatched.
    EnteredDanger { gas_level: f64 },

    /// Danger → Safe edge.
    ExitedDanger { gas_level: f64 },

    /// The incident transaction was included on-chain.
    IncidentConfirmed(Receipt),

    /// The incident report failed and was discarded (no retry, no rollback).
    IncidentFailed(Error),

    /// A snapshot was archived.
    TelemetryArchived(ContentRef),

    /// An archive attempt failed and was discarded.
    ArchiveFailed(Error),

    /// The upload gate refused a snapshot.
    UploadSkipped(SkipReason),

    /// A feed update was absent or not a valid snapshot.
    MalformedSnapshot,

    /// Periodic counter dump.
    Heartbeat(MetricsSnapshot),
}
