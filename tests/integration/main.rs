//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no network.

mod bridge_tests;
mod config_tests;
mod mock_ports;
mod stream_tests;
