//! Passphrase-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  Parameters come from `Argon2Params` and are
//! recorded in the store header, so a store always reopens with the
//! settings it was created with.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use super::keys::{MasterKey, KEY_LEN};
use crate::errors::{CredVaultError, Result};

/// Length of the per-store salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Derive the master key for a store from a passphrase and its salt.
///
/// Uses the default Argon2id parameters (64 MB, 3 iterations, 4 lanes).
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<MasterKey> {
    derive_key_with_params(passphrase, salt, &Argon2Params::default())
}

/// Derive the master key with explicit Argon2id parameters.
///
/// The same passphrase + salt + params always produce the same key.
/// Fails if the salt is not exactly `SALT_LEN` bytes or the parameters
/// fall below the safe minimums.
pub fn derive_key_with_params(
    passphrase: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<MasterKey> {
    if salt.len() != SALT_LEN {
        return Err(CredVaultError::KeyDerivationFailed(format!(
            "salt must be {SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }
    if argon2_params.memory_kib < MIN_MEMORY_KIB {
        return Err(CredVaultError::KeyDerivationFailed(format!(
            "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
            argon2_params.memory_kib
        )));
    }
    if argon2_params.iterations < 1 {
        return Err(CredVaultError::KeyDerivationFailed(
            "Argon2 iterations must be at least 1".into(),
        ));
    }
    if argon2_params.parallelism < 1 {
        return Err(CredVaultError::KeyDerivationFailed(
            "Argon2 parallelism must be at least 1".into(),
        ));
    }

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| CredVaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = MasterKey::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase, salt, key.as_mut_bytes())
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
