//! Bridge configuration parameters
//!
//! Loaded once at startup (see [`crate::adapters::config_file`]) and
//! immutable for the lifetime of the process.  Secrets can be injected
//! from the environment instead of living in the file.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::app::records::Address;

/// Environment variable naming the config file path.
pub const CONFIG_PATH_ENV: &str = "CNGPROTECT_CONFIG";
/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "./cngprotect.json";

const FEED_AUTH_ENV: &str = "CNGPROTECT_FEED_AUTH";
const SIGNER_TOKEN_ENV: &str = "CNGPROTECT_SIGNER_TOKEN";
const WALLET_KEY_ENV: &str = "CNGPROTECT_WALLET_KEY";
const ARCHIVE_KEY_ENV: &str = "CNGPROTECT_ARCHIVE_KEY";

/// Core bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Identifier written into incident records.
    pub device_id: String,
    pub feed: FeedConfig,
    pub ledger: LedgerConfig,
    pub archive: ArchiveConfig,
    pub runtime: RuntimeConfig,
}

/// Telemetry subscription (Realtime Database REST stream).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Database root, e.g. `https://<project>.firebaseio.com`
    pub database_url: String,
    /// Path of the device's live-data node.
    pub device_path: String,
    /// Optional `auth=` credential appended to the stream URL.
    pub auth_token: Option<String>,
    /// Upper bound for the reconnect backoff (seconds).
    pub max_backoff_secs: u32,
}

/// Incident ledger (EVM JSON-RPC).
///
/// With `wallet_key` set, transactions are signed locally and the sender is
/// derived from the key.  Without it, the node signs for `sender_address`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub rpc_url: String,
    /// Incident contract address (`0x…`).
    pub contract_address: String,
    /// secp256k1 private key (64 hex digits).  Prefer the environment.
    pub wallet_key: Option<String>,
    /// EIP-155 chain id; fetched with `eth_chainId` when unset.
    pub chain_id: Option<u64>,
    /// Account the node signs for (`0x…`).  Only used without `wallet_key`.
    pub sender_address: String,
    /// Bearer credential for the RPC endpoint.
    pub signer_token: Option<String>,
    /// Optional explicit gas limit; the node estimates when unset.
    pub gas_limit: Option<u64>,
    /// Give up waiting for a receipt after this long (seconds).
    pub confirm_timeout_secs: u32,
    /// Receipt polling interval (milliseconds).
    pub confirm_poll_ms: u32,
    /// Per-request HTTP timeout (seconds).
    pub request_timeout_secs: u32,
}

/// Which archive backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    /// Upload to a storage gateway over HTTP.  The gateway must speak the
    /// digest/signature protocol described in [`crate::adapters::archive`].
    Http,
    /// Dry run: copy artifacts into a local directory.
    Local,
}

/// Telemetry archive (content-addressed storage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub mode: ArchiveMode,
    pub indexer_url: String,
    pub upload_path: String,
    /// Key for the `X-Signature` HMAC over each upload body.
    pub signing_key: Option<String>,
    /// Transient artifact, overwritten every cycle.
    pub artifact_path: String,
    /// Destination directory for [`ArchiveMode::Local`].
    pub local_dir: String,
    /// Per-request HTTP timeout (seconds).
    pub request_timeout_secs: u32,
}

/// Process runtime knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Heartbeat (metrics dump) interval (seconds).
    pub stats_interval_secs: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device_id: "Device_01".into(),
            feed: FeedConfig::default(),
            ledger: LedgerConfig::default(),
            archive: ArchiveConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            database_url: "https://cng-protect-default-rtdb.firebaseio.com".into(),
            device_path: "/cng_protect/devices/device_01/live_data".into(),
            auth_token: None,
            max_backoff_secs: 60,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://evmrpc-testnet.0g.ai".into(),
            contract_address: "0xD74Dd42d21e4784232E85A38485d7eD8Af3D7beB".into(),
            wallet_key: None,
            chain_id: None,
            sender_address: String::new(),
            signer_token: None,
            gas_limit: None,
            confirm_timeout_secs: 120,
            confirm_poll_ms: 2000,
            request_timeout_secs: 30,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            mode: ArchiveMode::Local,
            indexer_url: "https://indexer-storage-testnet-turbo.0g.ai".into(),
            upload_path: "/file/upload".into(),
            signing_key: None,
            artifact_path: "./temp_log.json".into(),
            local_dir: "./archive".into(),
            request_timeout_secs: 60,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stats_interval_secs: 300,
        }
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

fn is_key_hex(s: &str) -> bool {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    digits.len() == 64 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

impl BridgeConfig {
    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("device_id must not be empty"));
        }

        if !is_http_url(&self.feed.database_url) {
            return Err(ConfigError::ValidationFailed("feed.database_url must be an http(s) URL"));
        }
        if !self.feed.device_path.starts_with('/') {
            return Err(ConfigError::ValidationFailed("feed.device_path must start with '/'"));
        }
        if self.feed.max_backoff_secs == 0 {
            return Err(ConfigError::ValidationFailed("feed.max_backoff_secs must be > 0"));
        }

        if !is_http_url(&self.ledger.rpc_url) {
            return Err(ConfigError::ValidationFailed("ledger.rpc_url must be an http(s) URL"));
        }
        if self.ledger.contract_address.parse::<Address>().is_err() {
            return Err(ConfigError::ValidationFailed("ledger.contract_address is not a 0x address"));
        }
        match &self.ledger.wallet_key {
            Some(key) if !is_key_hex(key) => {
                return Err(ConfigError::ValidationFailed("ledger.wallet_key must be 64 hex digits"));
            }
            Some(_) => {}
            None => {
                if self.ledger.sender_address.parse::<Address>().is_err() {
                    return Err(ConfigError::ValidationFailed(
                        "ledger.sender_address is not a 0x address (or set a wallet key)",
                    ));
                }
            }
        }
        if self.ledger.chain_id == Some(0) {
            return Err(ConfigError::ValidationFailed("ledger.chain_id must be > 0"));
        }
        if self.ledger.confirm_timeout_secs == 0 || self.ledger.confirm_poll_ms == 0 {
            return Err(ConfigError::ValidationFailed("ledger confirmation timing must be > 0"));
        }
        if self.ledger.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed("ledger.request_timeout_secs must be > 0"));
        }

        if self.archive.artifact_path.is_empty() {
            return Err(ConfigError::ValidationFailed("archive.artifact_path must not be empty"));
        }
        match self.archive.mode {
            ArchiveMode::Http => {
                if !is_http_url(&self.archive.indexer_url) {
                    return Err(ConfigError::ValidationFailed(
                        "archive.indexer_url must be an http(s) URL",
                    ));
                }
                if !self.archive.upload_path.starts_with('/') {
                    return Err(ConfigError::ValidationFailed("archive.upload_path must start with '/'"));
                }
                if self.archive.request_timeout_secs == 0 {
                    return Err(ConfigError::ValidationFailed(
                        "archive.request_timeout_secs must be > 0",
                    ));
                }
            }
            ArchiveMode::Local => {
                if self.archive.local_dir.is_empty() {
                    return Err(ConfigError::ValidationFailed("archive.local_dir must not be empty"));
                }
            }
        }

        if self.runtime.stats_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("runtime.stats_interval_secs must be > 0"));
        }
        Ok(())
    }

    /// Overlay secrets from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay secrets from an arbitrary lookup (empty values are ignored).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key| lookup(key).filter(|v| !v.is_empty());
        if let Some(v) = get(FEED_AUTH_ENV) {
            self.feed.auth_token = Some(v);
        }
        if let Some(v) = get(SIGNER_TOKEN_ENV) {
            self.ledger.signer_token = Some(v);
        }
        if let Some(v) = get(WALLET_KEY_ENV) {
            self.ledger.wallet_key = Some(v);
        }
        if let Some(v) = get(ARCHIVE_KEY_ENV) {
            self.archive.signing_key = Some(v);
        }
    }

    /// Parsed contract address.  Only valid after [`validate`](Self::validate).
    pub fn contract(&self) -> Result<Address, ConfigError> {
        self.ledger
            .contract_address
            .parse()
            .map_err(ConfigError::ValidationFailed)
    }
}
