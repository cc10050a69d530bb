//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                          |
//! |----------------|--------------|--------------------------------------|
//! | `archive`      | ArchivePort  | Local dir / HTTP upload gateway      |
//! | `config_file`  | ConfigPort   | JSON file on disk                    |
//! | `ledger`       | LedgerPort   | EVM JSON-RPC (local or node signing) |
//! | `log_sink`     | EventSink    | `log` facade                         |
//!
//! The feed side (SnapshotSource) lives in [`crate::stream`].

pub mod archive;
pub mod config_file;
pub mod ledger;
pub mod log_sink;
pub mod offload;
pub(super) mod utils;
