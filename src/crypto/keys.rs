//! Key types and HKDF-SHA256 sub-key derivation.
//!
//! The Argon2id output is the **master key**.  Blocks are never
//! encrypted with it directly: a dedicated block key is expanded from it
//! with HKDF (RFC 5869) under a fixed context string, so a future
//! format can add independent sub-keys without touching the KDF.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::errors::{CredVaultError, Result};

/// Length of master and derived keys (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// HKDF `info` for the key that encrypts store blocks.
const BLOCK_KEY_INFO: &[u8] = b"credvault-block-key-v1";

/// A 32-byte key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.bytes
    }

    /// Derive the key used to encrypt and authenticate store blocks.
    pub fn derive_block_key(&self) -> Result<MasterKey> {
        derive_block_key(&self.bytes)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Derive the block-encryption key from master key bytes.
pub fn derive_block_key(master_key: &[u8]) -> Result<MasterKey> {
    // The master key already has high entropy (it came from Argon2id),
    // so the extract step runs with HKDF's default zero salt.
    let hk = Hkdf::<Sha256>::new(None, master_key);

    let mut okm = MasterKey::new([0u8; KEY_LEN]);
    hk.expand(BLOCK_KEY_INFO, okm.as_mut_bytes())
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
