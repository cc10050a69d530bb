//! Local secp256k1 wallet for signing incident transactions.

use core::fmt;

use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

use crate::app::ports::LedgerError;
use crate::app::records::Address;

use super::tx::{LegacyTx, TxSignature};

/// Keccak-256 (the pre-standard SHA-3 padding Ethereum uses).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// A private key and the account address derived from it.
pub struct Wallet {
    secp: Secp256k1<All>,
    secret: SecretKey,
    address: Address,
}

impl Wallet {
    /// Parse 64 hex digits, with or without a `0x` prefix.
    pub fn from_hex(key: &str) -> Result<Self, LedgerError> {
        let digits = key.trim().strip_prefix("0x").unwrap_or(key.trim());
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| LedgerError::Signing("wallet key is not 32 bytes of hex"))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|_| LedgerError::Signing("wallet key is not a valid secp256k1 scalar"))?;

        let secp = Secp256k1::new();
        let public = PublicKey::from_secret_key(&secp, &secret).serialize_uncompressed();
        let digest = keccak256(&public[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[12..]);

        Ok(Self {
            secp,
            secret,
            address: Address::from_bytes(address),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign `tx` and return the raw transaction bytes.
    pub fn sign(&self, tx: &LegacyTx) -> Result<Vec<u8>, LedgerError> {
        // secp256k1 0.27 takes the 32-byte digest through Message::from_slice
        let message = Message::from_slice(&tx.signing_hash())
            .map_err(|_| LedgerError::Signing("digest rejected"))?;
        let (recovery_id, compact) = self
            .secp
            .sign_ecdsa_recoverable(&message, &self.secret)
            .serialize_compact();

        let mut sig = TxSignature {
            v: tx.chain_id * 2 + 35 + recovery_id.to_i32() as u64,
            r: [0; 32],
            s: [0; 32],
        };
        sig.r.copy_from_slice(&compact[..32]);
        sig.s.copy_from_slice(&compact[32..]);
        Ok(tx.encode_signed(&sig))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address).finish_non_exhaustive()
    }
}
