//! Legacy (type 0) transactions with EIP-155 replay protection.
//!
//! ```text
//! signing payload: rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])
//! signed tx:       rlp([nonce, gasPrice, gas, to, value, data, v, r, s])
//!                  v = chainId * 2 + 35 + recovery_id
//! ```
//!
//! Integers are RLP-encoded big-endian without leading zero bytes; zero is
//! the empty string.

use crate::app::records::Address;

use super::wallet::keccak256;

/// An unsigned contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// Recoverable ECDSA signature in EIP-155 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSignature {
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl LegacyTx {
    fn encode_fields(&self, out: &mut Vec<u8>) {
        rlp_uint(out, u128::from(self.nonce));
        rlp_uint(out, self.gas_price);
        rlp_uint(out, u128::from(self.gas_limit));
        rlp_bytes(out, self.to.as_bytes());
        rlp_uint(out, self.value);
        rlp_bytes(out, &self.data);
    }

    /// RLP of the fields plus `chainId, 0, 0`.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(64 + self.data.len());
        self.encode_fields(&mut body);
        rlp_uint(&mut body, u128::from(self.chain_id));
        rlp_uint(&mut body, 0);
        rlp_uint(&mut body, 0);
        rlp_list(&body)
    }

    /// Digest the wallet signs.
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Raw bytes for `eth_sendRawTransaction`.
    pub fn encode_signed(&self, sig: &TxSignature) -> Vec<u8> {
        let mut body = Vec::with_capacity(128 + self.data.len());
        self.encode_fields(&mut body);
        rlp_uint(&mut body, u128::from(sig.v));
        rlp_bytes(&mut body, strip_zeros(&sig.r));
        rlp_bytes(&mut body, strip_zeros(&sig.s));
        rlp_list(&body)
    }
}

// ── RLP ───────────────────────────────────────────────────────

fn strip_zeros(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    &bytes[skip..]
}

fn rlp_header(out: &mut Vec<u8>, len: usize, offset: u8) {
    if len < 56 {
        out.push(offset + len as u8);
    } else {
        let be = (len as u64).to_be_bytes();
        let len_bytes = strip_zeros(&be);
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}

fn rlp_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    match bytes {
        [b] if *b < 0x80 => out.push(*b),
        _ => {
            rlp_header(out, bytes.len(), 0x80);
            out.extend_from_slice(bytes);
        }
    }
}

fn rlp_uint(out: &mut Vec<u8>, n: u128) {
    rlp_bytes(out, strip_zeros(&n.to_be_bytes()));
}

fn rlp_list(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 9);
    rlp_header(&mut out, body.len(), 0xc0);
    out.extend_from_slice(body);
    out
}
