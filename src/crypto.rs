//! Canonical hashing for PeerLedger
//!
//! Every identifier in the ledger (transaction ids, block hashes) is a
//! SHA-256 digest over a canonical field encoding. Fields are keyed by name
//! and always emitted in lexicographic name order, so the digest depends only
//! on the logical content and never on the order in which fields were added.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Hex digest used as `previous_hash` of the genesis block.
pub fn zero_hash() -> String {
    "0".repeat(HASH_HEX_LEN)
}

/// Hex-encoded SHA-256 of raw bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Str(String),
    Unsigned(u64),
    Signed(i64),
}

impl FieldValue {
    fn tag(&self) -> u8 {
        match self {
            FieldValue::Str(_) => b's',
            FieldValue::Unsigned(_) => b'u',
            FieldValue::Signed(_) => b'i',
        }
    }

    fn bytes(&self) -> Vec<u8> {
        match self {
            FieldValue::Str(s) => s.as_bytes().to_vec(),
            FieldValue::Unsigned(v) => v.to_le_bytes().to_vec(),
            FieldValue::Signed(v) => v.to_le_bytes().to_vec(),
        }
    }
}

/// Deterministic digest builder over a named field set.
///
/// Each field is encoded as `len(name) ‖ name ‖ tag ‖ len(value) ‖ value`
/// with little-endian `u64` lengths, which keeps distinct field sets from
/// sharing an encoding.
#[derive(Debug, Clone, Default)]
pub struct CanonicalHasher {
    fields: BTreeMap<&'static str, FieldValue>,
}

impl CanonicalHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_str(mut self, name: &'static str, value: &str) -> Self {
        self.fields.insert(name, FieldValue::Str(value.to_string()));
        self
    }

    pub fn field_u64(mut self, name: &'static str, value: u64) -> Self {
        self.fields.insert(name, FieldValue::Unsigned(value));
        self
    }

    pub fn field_i64(mut self, name: &'static str, value: i64) -> Self {
        self.fields.insert(name, FieldValue::Signed(value));
        self
    }

    /// Produce the hex digest. Pure: the same field set always yields the same digest.
    pub fn finalize(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, value) in &self.fields {
            let bytes = value.bytes();
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update([value.tag()]);
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
        }
        hex::encode(hasher.finalize())
    }
}
