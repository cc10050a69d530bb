//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! [`BridgeEvent`] through the `log` facade (`env_logger` in production).
//! A supervisor adapter forwarding events elsewhere would implement the
//! same trait.

use log::{debug, error, info};

use crate::app::events::BridgeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`BridgeEvent`] to the console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &BridgeEvent) {
        match event {
            BridgeEvent::Started { device_id } => {
                info!("START | watching device={}", device_id);
            }
            // The tracker already logs both edges at error/info.
            BridgeEvent::EnteredDanger { gas_level } => {
                debug!("DANGER | entered, gas={} | reporting incident", gas_level);
            }
            BridgeEvent::ExitedDanger { gas_level } => {
                debug!("DANGER | cleared, gas={}", gas_level);
            }
            BridgeEvent::IncidentConfirmed(receipt) => {
                info!(
                    "INCIDENT | confirmed tx={} block={}",
                    receipt.tx, receipt.block_number
                );
            }
            BridgeEvent::IncidentFailed(e) => {
                error!("INCIDENT | failed: {}", e);
            }
            BridgeEvent::TelemetryArchived(content) => {
                info!("ARCHIVE | uploaded root={}", content);
            }
            // Archive failures are routine on a flaky uplink; keep them quiet.
            BridgeEvent::ArchiveFailed(e) => {
                debug!("ARCHIVE | failed: {}", e);
            }
            BridgeEvent::UploadSkipped(reason) => {
                debug!("ARCHIVE | skipped ({:?})", reason);
            }
            BridgeEvent::MalformedSnapshot => {
                debug!("FEED | malformed or absent snapshot ignored");
            }
            BridgeEvent::Heartbeat(m) => {
                info!(
                    "STATS | snapshots={} malformed={} | danger in={} out={} | \
                     incidents ok={} failed={} | uploads ok={} failed={} | \
                     skipped busy={} danger={}",
                    m.snapshots,
                    m.malformed,
                    m.danger_entries,
                    m.danger_exits,
                    m.incidents_confirmed,
                    m.incidents_failed,
                    m.uploads_archived,
                    m.uploads_failed,
                    m.skipped_busy,
                    m.skipped_danger,
                );
            }
        }
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &BridgeEvent) {}
}
