//! AES-256-GCM authenticated encryption with caller-supplied nonces.
//!
//! The store format owns nonce allocation (a persisted counter), so
//! unlike a fire-and-forget helper these functions take the nonce and
//! return only `ciphertext || tag`.  Associated data binds every block
//! to the header and to its position in the file.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::errors::{CredVaultError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Encrypt and authenticate `plaintext` under a 32-byte `key`.
///
/// Output length is always `plaintext.len() + TAG_LEN`.
pub fn encrypt(key: &[u8], nonce: &[u8; NONCE_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CredVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CredVaultError::EncryptionFailed(format!("encryption error: {e}")))
}

/// Verify and decrypt `ciphertext || tag`.
///
/// Any failure (wrong key, wrong associated data, flipped bits, short
/// input) is reported as `AuthenticationFailed`.
pub fn decrypt(key: &[u8], nonce: &[u8; NONCE_LEN], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_LEN {
        return Err(CredVaultError::AuthenticationFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CredVaultError::AuthenticationFailed)?;

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CredVaultError::AuthenticationFailed)
}
