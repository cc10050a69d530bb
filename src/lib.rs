//! CNG-Protect bridge library.
//!
//! Watches one gas sensor's telemetry feed, records every transition into
//! danger on a ledger and archives safe snapshots to content-addressed
//! storage.  The pure-logic modules are exposed for integration testing;
//! network-facing code lives in [`adapters`] and [`stream`].

#![deny(unused_must_use)]
#![allow(async_fn_in_trait)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod danger;
pub mod diagnostics;
pub mod events;
pub mod gate;
pub mod snapshot;
pub mod stream;

mod error;

pub use error::{Error, Result};
