//! Bridge service: the hexagonal core.
//!
//! [`BridgeService`] owns the danger tracker and the upload gate, and
//! decides for every feed update which side effects may run.  All I/O flows
//! through port traits, making the whole control loop testable with mock
//! adapters.
//!
//! ```text
//!  SnapshotSource ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                     │      BridgeService        │
//!     LedgerPort ◀────│  DangerTracker · Gate     │
//!    ArchivePort ◀────│  Reporter · Publisher     │
//!                     └──────────────────────────┘
//! ```
//!
//! ## Scheduling
//!
//! The loop runs on a single-threaded cooperative executor.  For each
//! update it runs, in order:
//!
//! 1. the tracker (synchronous, so an edge is claimed before any await),
//!    spawning the reporter on `EnteredDanger`;
//! 2. the gate, spawning the publisher on admission.
//!
//! Reporter and publisher run as detached tasks, so a slow upload or a
//! slow confirmation never delays detection of the next edge.

use core::future::Future;
use core::time::Duration;
use std::rc::Rc;

use edge_executor::LocalExecutor;
use log::{debug, info};
use serde_json::Value;

use crate::danger::{DangerTracker, Transition};
use crate::diagnostics::BridgeMetrics;
use crate::events::FeedEvent;
use crate::gate::UploadGate;
use crate::snapshot::Snapshot;

use super::events::BridgeEvent;
use super::ports::{ArchivePort, EventSink, LedgerPort, SnapshotSource};
use super::publisher::TelemetryPublisher;
use super::reporter::IncidentReporter;

// ───────────────────────────────────────────────────────────────
// Task spawning
// ───────────────────────────────────────────────────────────────

/// Where the service launches its side-effect tasks.
pub trait TaskSpawner {
    /// Run `fut` to completion in the background.  Never cancelled.
    fn spawn_detached(&self, fut: impl Future<Output = ()> + 'static);
}

impl<const C: usize> TaskSpawner for LocalExecutor<'static, C> {
    fn spawn_detached(&self, fut: impl Future<Output = ()> + 'static) {
        self.spawn(fut).detach();
    }
}

// ───────────────────────────────────────────────────────────────
// BridgeService
// ───────────────────────────────────────────────────────────────

/// The bridge service orchestrates all domain logic.
pub struct BridgeService<L, A, S> {
    device_id: Rc<str>,
    danger: DangerTracker,
    gate: UploadGate,
    reporter: Rc<IncidentReporter<L>>,
    publisher: Rc<TelemetryPublisher<A>>,
    sink: Rc<S>,
    metrics: Rc<BridgeMetrics>,
}

impl<L, A, S> BridgeService<L, A, S>
where
    L: LedgerPort + 'static,
    A: ArchivePort + 'static,
    S: EventSink + 'static,
{
    pub fn new(
        device_id: &str,
        reporter: IncidentReporter<L>,
        publisher: TelemetryPublisher<A>,
        sink: Rc<S>,
        metrics: Rc<BridgeMetrics>,
    ) -> Self {
        Self {
            device_id: Rc::from(device_id),
            danger: DangerTracker::new(),
            gate: UploadGate::new(),
            reporter: Rc::new(reporter),
            publisher: Rc::new(publisher),
            sink,
            metrics,
        }
    }

    // ── Control loop ──────────────────────────────────────────

    /// Consume feed events until the source reports [`FeedEvent::Closed`].
    ///
    /// Tasks still in flight when the feed closes keep running on the
    /// spawner.
    pub async fn run(&self, source: &impl SnapshotSource, spawner: &impl TaskSpawner) {
        self.sink.emit(&BridgeEvent::Started {
            device_id: self.device_id.to_string(),
        });
        info!("BridgeService watching device {}", self.device_id);

        loop {
            match source.next_event().await {
                FeedEvent::Update(value) => {
                    self.handle_update(&value, spawner);
                    // Let freshly spawned side effects reach their first
                    // suspension point before the next update is taken.
                    futures_lite::future::yield_now().await;
                }
                FeedEvent::Closed => {
                    info!("BridgeService: feed closed, leaving control loop");
                    break;
                }
            }
        }
    }

    /// Process one feed update: tracker first, then the upload gate.
    pub fn handle_update(&self, value: &Value, spawner: &impl TaskSpawner) {
        let Some(snapshot) = Snapshot::from_value(value) else {
            debug!("BridgeService: ignoring absent/malformed update");
            self.metrics.record_malformed();
            self.sink.emit(&BridgeEvent::MalformedSnapshot);
            return;
        };
        self.metrics.record_snapshot();

        if let Some(transition) = self.danger.observe(&snapshot) {
            self.on_transition(transition, &snapshot, spawner);
        }

        self.try_publish(snapshot, spawner);
    }

    /// Upload gate: admit the publish only if no other publish is in flight
    /// and no incident is active.  Returns whether the publish was started.
    pub fn try_publish(&self, snapshot: Snapshot, spawner: &impl TaskSpawner) -> bool {
        let permit = match self.gate.try_acquire(self.danger.in_danger()) {
            Ok(permit) => permit,
            Err(reason) => {
                self.metrics.record_skip(reason);
                self.sink.emit(&BridgeEvent::UploadSkipped(reason));
                return false;
            }
        };

        let publisher = Rc::clone(&self.publisher);
        let sink = Rc::clone(&self.sink);
        let metrics = Rc::clone(&self.metrics);
        spawner.spawn_detached(async move {
            let _permit = permit;
            match publisher.publish(&snapshot).await {
                Ok(content) => {
                    metrics.record_upload(true);
                    sink.emit(&BridgeEvent::TelemetryArchived(content));
                }
                Err(e) => {
                    metrics.record_upload(false);
                    sink.emit(&BridgeEvent::ArchiveFailed(e));
                }
            }
        });
        true
    }

    /// Emit a metrics heartbeat every `interval`, forever.
    pub async fn heartbeat(&self, interval: Duration) {
        loop {
            async_io_mini::Timer::after(interval).await;
            self.sink
                .emit(&BridgeEvent::Heartbeat(self.metrics.snapshot()));
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Whether an incident is currently active.
    pub fn in_danger(&self) -> bool {
        self.danger.in_danger()
    }

    /// Whether a publish currently holds the upload gate.
    pub fn is_uploading(&self) -> bool {
        self.gate.is_uploading()
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    pub fn reporter(&self) -> &IncidentReporter<L> {
        &self.reporter
    }

    pub fn publisher(&self) -> &TelemetryPublisher<A> {
        &self.publisher
    }

    // ── Internal ──────────────────────────────────────────────

    fn on_transition(&self, transition: Transition, snapshot: &Snapshot, spawner: &impl TaskSpawner) {
        let gas_level = snapshot.gas_level;
        match transition {
            Transition::EnteredDanger => {
                self.metrics.record_danger_entry();
                self.sink.emit(&BridgeEvent::EnteredDanger { gas_level });

                let reporter = Rc::clone(&self.reporter);
                let sink = Rc::clone(&self.sink);
                let metrics = Rc::clone(&self.metrics);
                let device_id = Rc::clone(&self.device_id);
                spawner.spawn_detached(async move {
                    match reporter.report(&device_id, gas_level).await {
                        Ok(receipt) => {
                            metrics.record_incident(true);
                            sink.emit(&BridgeEvent::IncidentConfirmed(receipt));
                        }
                        Err(e) => {
                            metrics.record_incident(false);
                            sink.emit(&BridgeEvent::IncidentFailed(e));
                        }
                    }
                });
            }
            Transition::ExitedDanger => {
                self.metrics.record_danger_exit();
                self.sink.emit(&BridgeEvent::ExitedDanger { gas_level });
            }
        }
    }
}
