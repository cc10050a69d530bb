//! Port traits: the hexagonal boundary between the bridge core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BridgeService (domain)
//! ```
//!
//! Driven adapters (ledger RPC, storage indexer, feed stream, event sinks,
//! config file) implement these traits.  The
//! [`BridgeService`](super::service::BridgeService) consumes them via
//! generics, so the control loop never touches the network directly.
//!
//! The async ports are consumed on a single-threaded executor, so their
//! futures are not required to be `Send`.
//!
//! ## Failure policy
//!
//! - Ledger and archive errors are typed and surface to the core, which
//!   reports them through [`EventSink`] and then discards them.
//! - **ConfigPort** implementations MUST validate before persisting.

#![allow(async_fn_in_trait)]

use core::fmt;
use std::path::Path;

use crate::app::records::{Address, ContentRef, IncidentRecord, Receipt, TxHash};
use crate::config::BridgeConfig;
use crate::events::FeedEvent;

// ───────────────────────────────────────────────────────────────
// Ledger port (domain → blockchain)
// ───────────────────────────────────────────────────────────────

/// Black-box transaction submitter with nonce lookup.
pub trait LedgerPort {
    /// The sender's next transaction sequence number (nonce), fetched live.
    async fn sequence_number(&self, address: &Address) -> Result<u64, LedgerError>;

    /// Submit one incident-record transaction with an explicit nonce.
    async fn submit_incident(&self, record: &IncidentRecord, nonce: u64) -> Result<TxHash, LedgerError>;

    /// Wait until `tx` is included on-chain.
    async fn wait_for_confirmation(&self, tx: &TxHash) -> Result<Receipt, LedgerError>;
}

// ───────────────────────────────────────────────────────────────
// Archive port (domain → content-addressed storage)
// ───────────────────────────────────────────────────────────────

/// Black-box content uploader.  Endpoint and signer are adapter state.
pub trait ArchivePort {
    /// Upload the artifact at `artifact` and return its content reference.
    async fn upload(&self, artifact: &Path) -> Result<ContentRef, ArchiveError>;
}

// ───────────────────────────────────────────────────────────────
// Snapshot source (driven adapter: feed → domain)
// ───────────────────────────────────────────────────────────────

/// Push-style telemetry subscription, consumed one event at a time.
pub trait SnapshotSource {
    /// Wait for the next feed event.
    async fn next_event(&self) -> FeedEvent;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / supervision)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`BridgeEvent`](super::events::BridgeEvent)s
/// through this port.  Swallowed failures arrive here too, so a supervising
/// component (or a test) can observe what the core discarded.
///
/// Takes `&self`: the sink is shared between the control loop and the
/// spawned reporter/publisher tasks.
pub trait EventSink {
    fn emit(&self, event: &super::events::BridgeEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists process configuration.
///
/// Implementations MUST call [`BridgeConfig::validate`] before persisting
/// and reject invalid values with [`ConfigError::ValidationFailed`].
pub trait ConfigPort {
    /// Load configuration.  Returns [`ConfigError::NotFound`] if none exists.
    fn load(&self) -> Result<BridgeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &BridgeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`LedgerPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// HTTP / connection failure talking to the RPC endpoint.
    Transport(String),
    /// The node answered with a JSON-RPC error object.
    Rpc { code: i64, message: String },
    /// The node answered with something we could not interpret.
    BadResponse(&'static str),
    /// The transaction was mined but reverted.
    Reverted(TxHash),
    /// No receipt appeared before the confirmation deadline.
    ConfirmationTimeout(TxHash),
    /// The incident could not be encoded (e.g. negative gas level).
    InvalidRecord(&'static str),
    /// The wallet key is unusable or signing failed.
    Signing(&'static str),
}

/// Errors from [`ArchivePort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// Writing or reading the transient artifact failed.
    Artifact(String),
    /// HTTP / connection failure talking to the storage endpoint.
    Transport(String),
    /// The storage network refused the upload.
    Rejected { status: u16, message: String },
    /// The storage network answered with something we could not interpret.
    BadResponse(&'static str),
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found (first run).
    NotFound,
    /// Stored config failed to parse.
    Corrupted(String),
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError(String),
}

/// Errors from the telemetry feed transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// HTTP / connection failure.
    Transport(String),
    /// The server answered the stream request with a non-success status.
    Status(u16),
    /// A `put`/`patch` payload was not valid JSON or lacked `path`/`data`.
    BadPayload(&'static str),
    /// The server cancelled the listener (e.g. security rules changed).
    Cancelled,
    /// The auth credential expired; reconnect required.
    AuthRevoked,
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Rpc { code, message } => write!(f, "rpc error {code}: {message}"),
            Self::BadResponse(what) => write!(f, "bad response: {what}"),
            Self::Reverted(tx) => write!(f, "transaction {tx} reverted"),
            Self::ConfirmationTimeout(tx) => write!(f, "transaction {tx} not confirmed in time"),
            Self::InvalidRecord(why) => write!(f, "invalid incident record: {why}"),
            Self::Signing(why) => write!(f, "signing: {why}"),
        }
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact(msg) => write!(f, "artifact: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Rejected { status, message } => write!(f, "rejected ({status}): {message}"),
            Self::BadResponse(what) => write!(f, "bad response: {what}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Status(code) => write!(f, "stream refused with HTTP {code}"),
            Self::BadPayload(what) => write!(f, "bad payload: {what}"),
            Self::Cancelled => write!(f, "listener cancelled by server"),
            Self::AuthRevoked => write!(f, "auth revoked"),
        }
    }
}

impl std::error::Error for LedgerError {}
impl std::error::Error for ArchiveError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for FeedError {}
