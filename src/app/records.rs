//! Value types exchanged across the ledger and archive ports.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ports::LedgerError;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// 20-byte EVM account / contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = &'static str;

    /// Parse `0x`-prefixed, 40-hex-digit text (case-insensitive, no checksum).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").ok_or("address must start with 0x")?;
        if digits.len() != 40 {
            return Err("address must have 40 hex digits");
        }
        let mut out = [0u8; 20];
        hex::decode_to_slice(digits, &mut out).map_err(|_| "address is not valid hex")?;
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// Transaction hash
// ---------------------------------------------------------------------------

/// `0x` + 64 hex digits, as returned by `eth_send(Raw)Transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(heapless::String<66>);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").ok_or("tx hash must start with 0x")?;
        if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err("tx hash must have 64 hex digits");
        }
        let mut out = heapless::String::new();
        out.push_str(s).map_err(|()| "tx hash too long")?;
        Ok(Self(out))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// Confirmation of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx: TxHash,
    pub block_number: u64,
}

// ---------------------------------------------------------------------------
// Content reference
// ---------------------------------------------------------------------------

/// Opaque locator returned by the storage network (root hash, CID, …).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef(pub String);

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Incident record
// ---------------------------------------------------------------------------

/// Payload of one `mintIncidentReport(deviceId, gasLevel)` transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRecord {
    pub device_id: String,
    /// Gas level as the contract's `uint256`, rounded from the sensor value.
    pub gas_level: u64,
}

impl IncidentRecord {
    /// Build a record from a raw snapshot gas level.
    ///
    /// The contract takes an unsigned integer: negative, NaN and infinite
    /// readings are rejected rather than clamped.
    pub fn new(device_id: &str, gas_level: f64) -> Result<Self, LedgerError> {
        if device_id.is_empty() {
            return Err(LedgerError::InvalidRecord("empty device id"));
        }
        if !gas_level.is_finite() {
            return Err(LedgerError::InvalidRecord("gas level is not finite"));
        }
        if gas_level < 0.0 {
            return Err(LedgerError::InvalidRecord("gas level is negative"));
        }
        if gas_level >= u64::MAX as f64 {
            return Err(LedgerError::InvalidRecord("gas level out of range"));
        }
        Ok(Self {
            device_id: device_id.to_owned(),
            gas_level: gas_level.round() as u64,
        })
    }
}
