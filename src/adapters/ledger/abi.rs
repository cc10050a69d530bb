//! Calldata for the incident contract.
//!
//! Only one function is ever called, so the encoder is hand-written rather
//! than generated:
//!
//! ```text
//! mintIncidentReport(string deviceId, uint256 gasLevel)
//!
//! ┌──────────┬────────────┬────────────┬────────────┬──────────────────┐
//! │ selector │ offset=64  │ gasLevel   │ len(id)    │ id bytes, padded │
//! │ 4 bytes  │ 32 bytes   │ 32 bytes   │ 32 bytes   │ ceil(len/32)*32  │
//! └──────────┴────────────┴────────────┴────────────┴──────────────────┘
//! ```

use crate::app::records::IncidentRecord;

/// First four bytes of `keccak256("mintIncidentReport(string,uint256)")`.
pub const MINT_INCIDENT_SELECTOR: [u8; 4] = [0xb2, 0x0a, 0x25, 0x34];

const WORD: usize = 32;

fn push_u64_word(out: &mut Vec<u8>, n: u64) {
    out.extend_from_slice(&[0u8; WORD - 8]);
    out.extend_from_slice(&n.to_be_bytes());
}

/// ABI-encode a `mintIncidentReport` call.
pub fn encode_mint_incident(record: &IncidentRecord) -> Vec<u8> {
    let id = record.device_id.as_bytes();
    let padded = id.len().div_ceil(WORD) * WORD;

    let mut out = Vec::with_capacity(4 + 3 * WORD + padded);
    out.extend_from_slice(&MINT_INCIDENT_SELECTOR);
    // Head: dynamic string offset, then the static uint256.
    push_u64_word(&mut out, (2 * WORD) as u64);
    push_u64_word(&mut out, record.gas_level);
    // Tail: string length and data.
    push_u64_word(&mut out, id.len() as u64);
    out.extend_from_slice(id);
    out.resize(4 + 3 * WORD + padded, 0);
    out
}

/// Calldata as `0x`-prefixed hex for the JSON-RPC transaction object.
pub fn mint_incident_calldata(record: &IncidentRecord) -> String {
    format!("0x{}", hex::encode(encode_mint_incident(record)))
}
