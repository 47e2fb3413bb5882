//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id passphrase-based key derivation (`kdf`)
//! - Zeroizing key type and HKDF block-key derivation (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, derive_key_with_params, generate_salt, Argon2Params, SALT_LEN};
pub use keys::{derive_block_key, MasterKey, KEY_LEN};
