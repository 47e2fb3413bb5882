//! Account records and their binary codec.
//!
//! A record is encoded as three length-prefixed fields:
//!
//! ```text
//! [name_len: u32 LE][name][username_len: u32 LE][username][secret_len: u32 LE][secret]
//! ```
//!
//! Explicit lengths mean fields may contain any bytes, including the
//! `|` separator the old text format choked on.

use std::collections::BTreeMap;
use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{CredVaultError, Result};

/// Size of each length prefix.
const LEN_PREFIX: usize = 4;

/// Decrypted accounts keyed by name, iterated in name order.
pub type AccountIndex = BTreeMap<String, AccountRecord>;

/// One account stored in the vault.
///
/// All three fields are wiped from memory when the record is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccountRecord {
    /// Unique, case-sensitive account name (e.g. "github").
    pub name: String,
    /// Login name for the account.
    pub username: String,
    /// The stored password or secret.
    pub secret: String,
}

impl AccountRecord {
    pub fn new(name: impl Into<String>, username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Serialize a record into its binary layout.
pub fn encode(record: &AccountRecord) -> Result<Zeroizing<Vec<u8>>> {
    let fields = [&record.name, &record.username, &record.secret];
    let total = fields.iter().map(|f| LEN_PREFIX + f.len()).sum();
    let mut buf = Zeroizing::new(Vec::with_capacity(total));

    for field in fields {
        let len = u32::try_from(field.len()).map_err(|_| {
            CredVaultError::MalformedRecord(format!("field length {} exceeds u32::MAX", field.len()))
        })?;
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(field.as_bytes());
    }

    Ok(buf)
}

/// Parse a record produced by `encode`.
///
/// Rejects declared lengths that run past the buffer, trailing bytes,
/// and fields that are not valid UTF-8.
pub fn decode(bytes: &[u8]) -> Result<AccountRecord> {
    let mut reader = FieldReader { bytes, pos: 0 };

    let name = reader.next_field("name")?;
    let username = reader.next_field("username")?;
    let secret = reader.next_field("secret")?;

    if reader.pos != bytes.len() {
        return Err(CredVaultError::MalformedRecord(format!(
            "{} trailing bytes after record",
            bytes.len() - reader.pos
        )));
    }

    Ok(AccountRecord {
        name,
        username,
        secret,
    })
}

struct FieldReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl FieldReader<'_> {
    fn next_field(&mut self, what: &str) -> Result<String> {
        let prefix_end = self.pos + LEN_PREFIX;
        let prefix = self
            .bytes
            .get(self.pos..prefix_end)
            .ok_or_else(|| CredVaultError::MalformedRecord(format!("missing {what} length")))?;
        let mut len_bytes = [0u8; LEN_PREFIX];
        len_bytes.copy_from_slice(prefix);
        let len = u32::from_le_bytes(len_bytes) as usize;

        let field_end = prefix_end
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                CredVaultError::MalformedRecord(format!("{what} length {len} exceeds record bounds"))
            })?;

        let field = String::from_utf8(self.bytes[prefix_end..field_end].to_vec()).map_err(|e| {
            let mut bad = e.into_bytes();
            bad.zeroize();
            CredVaultError::MalformedRecord(format!("{what} is not valid UTF-8"))
        })?;

        self.pos = field_end;
        Ok(field)
    }
}
