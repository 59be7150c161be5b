//! Stable hashing of plans for explain output and query reports.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }

    /// First 12 hex chars, enough to tell plans apart in logs.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v)?;
    Ok(hash_bytes(&bytes))
}
