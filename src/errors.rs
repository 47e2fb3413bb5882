use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All errors that can occur in CredVault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Authentication failed: wrong passphrase or corrupted store")]
    AuthenticationFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Store file errors ---
    #[error("Store not found at {0}")]
    StoreNotFound(PathBuf),

    #[error("Store already exists at {0}")]
    StoreAlreadyExists(PathBuf),

    #[error("Unsupported store format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    // --- Account errors ---
    #[error("Account '{0}' already exists (use `modify` to update it)")]
    DuplicateAccount(String),

    #[error("Account '{0}' not found")]
    AccountNotFound(String),

    #[error("Unknown message id {0} (0 = password, 1 = username)")]
    InvalidMessageId(u32),

    // --- Session errors ---
    #[error("No store is open")]
    NotOpen,

    #[error("Timed out after {0:?} waiting for the store lock")]
    LockTimeout(Duration),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Input errors ---
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;

/// Stable numeric status codes handed across the C boundary.
///
/// Values never change between releases; new kinds get new numbers.
pub mod status {
    pub const OK: i32 = 0;
    pub const ALREADY_EXISTS: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const AUTHENTICATION: i32 = 3;
    pub const FORMAT_VERSION: i32 = 4;
    pub const MALFORMED_RECORD: i32 = 5;
    pub const DUPLICATE_ACCOUNT: i32 = 6;
    pub const ACCOUNT_NOT_FOUND: i32 = 7;
    pub const NOT_OPEN: i32 = 8;
    pub const LOCK_TIMEOUT: i32 = 9;
    pub const IO: i32 = 10;
    pub const KEY_DERIVATION: i32 = 11;
    pub const ENCRYPTION: i32 = 12;
    pub const INVALID_INPUT: i32 = 13;
    pub const INVALID_MESSAGE_ID: i32 = 14;
    pub const CONFIG: i32 = 15;
    pub const INTERNAL: i32 = 99;
}

impl CredVaultError {
    /// The status code reported for this error at the C boundary.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::StoreAlreadyExists(_) => status::ALREADY_EXISTS,
            Self::StoreNotFound(_) => status::NOT_FOUND,
            Self::AuthenticationFailed => status::AUTHENTICATION,
            Self::UnsupportedFormat(_) => status::FORMAT_VERSION,
            Self::MalformedRecord(_) => status::MALFORMED_RECORD,
            Self::DuplicateAccount(_) => status::DUPLICATE_ACCOUNT,
            Self::AccountNotFound(_) => status::ACCOUNT_NOT_FOUND,
            Self::NotOpen => status::NOT_OPEN,
            Self::LockTimeout(_) => status::LOCK_TIMEOUT,
            Self::Io(_) => status::IO,
            Self::KeyDerivationFailed(_) => status::KEY_DERIVATION,
            Self::EncryptionFailed(_) => status::ENCRYPTION,
            Self::InvalidInput(_) | Self::UserCancelled => status::INVALID_INPUT,
            Self::InvalidMessageId(_) => status::INVALID_MESSAGE_ID,
            Self::ConfigError(_) => status::CONFIG,
        }
    }
}
