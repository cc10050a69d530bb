//! Telemetry snapshot: one update pushed by the device feed.
//!
//! The device firmware writes `is_danger` and `gas_level` alongside any
//! number of extra fields (RSSI, firmware version, timestamps …).  The
//! bridge only interprets the two named fields.  The received value is kept
//! as-is and is what gets archived, so integer readings stay integers and
//! unknown fields pass through untouched.

use serde::Deserialize;
use serde_json::{Value, json};

/// A point-in-time device snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Device firmware's leak verdict.
    pub is_danger: bool,
    /// Gas sensor reading (ppm-ish, device-defined scale), widened for the
    /// danger and report paths.
    pub gas_level: f64,
    raw: Value,
}

/// The two fields the bridge acts on.  Everything else is ignored here.
#[derive(Deserialize)]
struct Reading {
    is_danger: bool,
    gas_level: f64,
}

impl Snapshot {
    /// Build a snapshot with no extra fields.
    pub fn new(is_danger: bool, gas_level: f64) -> Self {
        Self {
            is_danger,
            gas_level,
            raw: json!({ "is_danger": is_danger, "gas_level": gas_level }),
        }
    }

    /// Interpret a feed value as a snapshot.
    ///
    /// Returns `None` for absent (`null`) or malformed values: the
    /// control loop treats those as "nothing happened".
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let reading = Reading::deserialize(value).ok()?;
        Some(Self {
            is_danger: reading.is_danger,
            gas_level: reading.gas_level,
            raw: value.clone(),
        })
    }

    /// The payload exactly as it was received.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Serialise the received payload into the archive artifact.
    pub fn to_artifact_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.raw)
    }
}
