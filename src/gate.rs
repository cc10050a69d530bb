//! Upload gate: single-permit mutual exclusion for telemetry archival.
//!
//! Admission predicate: `!uploading && !in_danger`.  A refused snapshot is
//! dropped, not queued: the stream can outrun a single upload, and the
//! publisher writes one shared artifact that two uploads would race on.
//!
//! The flag lives in an `Rc<Cell<bool>>`: the gate and its permits never
//! leave the control-loop thread, and test-and-set completes without an
//! await in between, so no other task can observe a half-taken permit.
//! It is released when the returned [`UploadPermit`] is dropped, so every
//! exit path of the publish (success, error, panic unwinding) gives the
//! permit back.

use core::cell::Cell;
use std::rc::Rc;

/// Why an upload was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another publish is still in flight.
    Busy,
    /// An incident is active; archival is suspended.
    Danger,
}

/// Holds the process-wide `uploading` flag.
#[derive(Debug, Default)]
pub struct UploadGate {
    uploading: Rc<Cell<bool>>,
}

impl UploadGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the single upload permit.
    ///
    /// Danger is checked first: while an incident is active the gate is not
    /// even contended.
    pub fn try_acquire(&self, in_danger: bool) -> Result<UploadPermit, SkipReason> {
        if in_danger {
            return Err(SkipReason::Danger);
        }
        if self.uploading.replace(true) {
            return Err(SkipReason::Busy);
        }
        Ok(UploadPermit {
            uploading: Rc::clone(&self.uploading),
        })
    }

    /// True while a publish holds the permit.
    pub fn is_uploading(&self) -> bool {
        self.uploading.get()
    }
}

/// Proof of admission.  Dropping it re-opens the gate.
#[derive(Debug)]
pub struct UploadPermit {
    uploading: Rc<Cell<bool>>,
}

impl Drop for UploadPermit {
    fn drop(&mut self) {
        let was = self.uploading.replace(false);
        debug_assert!(was, "upload gate released twice");
    }
}
