//! Danger state tracker.
//!
//! Two-state machine {Safe, Danger}, initial state Safe.  The tracker runs
//! **first** for every snapshot, before the upload gate, so a snapshot that
//! flips the device into danger is never archived.
//!
//! ## Edge triggering
//!
//! 1. `is_danger == true` while Safe   → flip to Danger, emit `EnteredDanger`.
//! 2. `is_danger == false` while Danger → flip to Safe, emit `ExitedDanger`.
//! 3. Anything else is a steady state and produces no transition.
//!
//! The flag is updated with a single atomic `swap`, so two observers racing
//! on the same edge can never both see the transition.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{error, info};

use crate::snapshot::Snapshot;

/// Edge produced by [`DangerTracker::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EnteredDanger,
    ExitedDanger,
}

/// Holds the process-wide `in_danger` flag.
#[derive(Debug, Default)]
pub struct DangerTracker {
    in_danger: AtomicBool,
}

impl DangerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one snapshot through the state machine.
    pub fn observe(&self, snapshot: &Snapshot) -> Option<Transition> {
        let was = self.in_danger.swap(snapshot.is_danger, Ordering::AcqRel);
        match (was, snapshot.is_danger) {
            (false, true) => {
                error!("DANGER ENTERED: gas={}", snapshot.gas_level);
                Some(Transition::EnteredDanger)
            }
            (true, false) => {
                info!("DANGER CLEARED: gas={}", snapshot.gas_level);
                Some(Transition::ExitedDanger)
            }
            _ => None,
        }
    }

    /// True while an incident is active.
    pub fn in_danger(&self) -> bool {
        self.in_danger.load(Ordering::Acquire)
    }
}
