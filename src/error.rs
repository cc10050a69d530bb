//! Unified error type for the bridge.
//!
//! Each port reports its own typed error (see [`crate::app::ports`]); the
//! reporter and publisher funnel them into this enum so the event sink has
//! one failure type to render.

use core::fmt;

use crate::app::ports::{ArchiveError, ConfigError, FeedError, LedgerError};

// ---------------------------------------------------------------------------
// Top-level bridge error
// ---------------------------------------------------------------------------

/// Every fallible bridge operation funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Incident submission or confirmation failed.
    Ledger(LedgerError),
    /// Telemetry archival failed.
    Archive(ArchiveError),
    /// The telemetry feed transport failed.
    Feed(FeedError),
    /// Configuration is invalid or could not be loaded.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ledger(e) => write!(f, "ledger: {e}"),
            Self::Archive(e) => write!(f, "archive: {e}"),
            Self::Feed(e) => write!(f, "feed: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<LedgerError> for Error {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl From<ArchiveError> for Error {
    fn from(e: ArchiveError) -> Self {
        Self::Archive(e)
    }
}

impl From<FeedError> for Error {
    fn from(e: FeedError) -> Self {
        Self::Feed(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Bridge-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
