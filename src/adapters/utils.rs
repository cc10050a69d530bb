//! Shared helpers for the HTTP adapters.
//!
//! JSON-RPC quantities are `0x`-prefixed hex without leading zeros; the
//! ledger adapter encodes and decodes them in several places.

/// Encode `n` as a JSON-RPC quantity (`0x0`, `0x1a`, …).
pub(super) fn to_quantity(n: u64) -> String {
    format!("{n:#x}")
}

/// Decode a JSON-RPC quantity.  Returns `None` for anything that is not
/// `0x` followed by 1..=16 hex digits.
pub(super) fn parse_quantity(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x")?;
    if digits.is_empty() || digits.len() > 16 {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Join a base URL and an absolute path without doubling the slash.
pub(super) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
