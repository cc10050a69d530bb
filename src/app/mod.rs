//! Application core: bridge orchestration with no direct I/O.
//!
//! This module contains the business rules for the bridge: incident
//! reporting, telemetry publishing and the control loop that decides which
//! of them may run for each update.  All interaction with the ledger, the
//! storage network and the telemetry feed happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without a
//! network.

pub mod events;
pub mod ports;
pub mod publisher;
pub mod records;
pub mod reporter;
pub mod service;
