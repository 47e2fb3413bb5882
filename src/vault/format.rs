//! Binary store file format and atomic persistence.
//!
//! A `.cvlt` file has this layout (integers little-endian):
//!
//! ```text
//! [CVLT: 4][version: u32][salt: 16][kdf memory_kib: u32][kdf iterations: u32]
//! [kdf parallelism: u32][nonce_counter: u64][record_count: u32]       <- 48-byte header
//! [block_len: u32][nonce: 12][ciphertext + tag]                         <- key-check block
//! [block_len: u32][nonce: 12][ciphertext + tag]  x record_count         <- account records
//! ```
//!
//! - **Magic** (`CVLT`) and **version** identify the container.
//! - **Salt** and **KDF parameters** are what Argon2id needs to rebuild
//!   the master key, so a store reopens with the cost it was created with.
//! - **Nonce counter** is the next unused nonce.  Block `i` of a write
//!   uses `counter + i` followed by four random bytes drawn per write.
//! - Every block is AES-256-GCM sealed with associated data
//!   `header || i` (u32), where `i = 0` is the key-check block and
//!   records are `1..=record_count`.  Editing the header, reordering
//!   blocks, or splicing in blocks from another file fails authentication.
//! - Plaintexts are padded to a multiple of 64 bytes so block sizes do
//!   not reveal exact secret lengths.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rand::RngCore;
use zeroize::Zeroizing;

use super::record::{self, AccountIndex};
use crate::crypto::{
    decrypt, derive_key_with_params, encrypt, generate_salt, Argon2Params, MasterKey, NONCE_LEN,
    SALT_LEN, TAG_LEN,
};
use crate::errors::{CredVaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every store file.
const MAGIC: &[u8; 4] = b"CVLT";

/// Current binary format version.
pub const CURRENT_VERSION: u32 = 1;

/// Size of the fixed header.
pub const HEADER_LEN: usize = 48;

/// Block plaintexts are padded up to a multiple of this.
const BLOCK_ALIGN: usize = 64;

/// Plaintext of the key-check block.
const KEY_CHECK: &[u8] = b"CVLT key check v1";

/// Framing around each ciphertext: length prefix + nonce.
const BLOCK_OVERHEAD: usize = 4 + NONCE_LEN;

/// Largest Argon2 memory cost accepted from a file header (1 GiB).
const MAX_STORED_MEMORY_KIB: u32 = 1_048_576;

/// Largest iteration / lane count accepted from a file header.
const MAX_STORED_ROUNDS: u32 = 64;

// ---------------------------------------------------------------------------
// StoreHeader
// ---------------------------------------------------------------------------

/// The fixed-size header at the start of a store file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeader {
    pub version: u32,
    pub salt: [u8; SALT_LEN],
    pub kdf: Argon2Params,
    pub nonce_counter: u64,
    pub record_count: u32,
}

impl StoreHeader {
    /// A header for a brand-new, empty store.
    pub fn new(salt: [u8; SALT_LEN], kdf: Argon2Params) -> Self {
        Self {
            version: CURRENT_VERSION,
            salt,
            kdf,
            nonce_counter: 0,
            record_count: 0,
        }
    }

    /// Serialize to the on-disk byte layout.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..24].copy_from_slice(&self.salt);
        buf[24..28].copy_from_slice(&self.kdf.memory_kib.to_le_bytes());
        buf[28..32].copy_from_slice(&self.kdf.iterations.to_le_bytes());
        buf[32..36].copy_from_slice(&self.kdf.parallelism.to_le_bytes());
        buf[36..44].copy_from_slice(&self.nonce_counter.to_le_bytes());
        buf[44..48].copy_from_slice(&self.record_count.to_le_bytes());
        buf
    }

    /// Parse the header at the start of `data`.
    ///
    /// A missing magic or an unknown version is a format error; a header
    /// that is cut short or carries absurd KDF costs is treated as
    /// corruption.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 8 || &data[0..4] != MAGIC {
            return Err(CredVaultError::UnsupportedFormat(
                "missing CVLT magic bytes".into(),
            ));
        }

        let version = read_u32(data, 4);
        if version != CURRENT_VERSION {
            return Err(CredVaultError::UnsupportedFormat(format!(
                "unsupported version {version}, expected {CURRENT_VERSION}"
            )));
        }

        if data.len() < HEADER_LEN {
            return Err(CredVaultError::AuthenticationFailed);
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&data[8..24]);

        let kdf = Argon2Params {
            memory_kib: read_u32(data, 24),
            iterations: read_u32(data, 28),
            parallelism: read_u32(data, 32),
        };
        if kdf.memory_kib > MAX_STORED_MEMORY_KIB
            || kdf.iterations > MAX_STORED_ROUNDS
            || kdf.parallelism > MAX_STORED_ROUNDS
        {
            tracing::warn!(?kdf, "store header carries out-of-range KDF parameters");
            return Err(CredVaultError::AuthenticationFailed);
        }

        let mut counter = [0u8; 8];
        counter.copy_from_slice(&data[36..44]);

        Ok(Self {
            version,
            salt,
            kdf,
            nonce_counter: u64::from_le_bytes(counter),
            record_count: read_u32(data, 44),
        })
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(bytes)
}

// ---------------------------------------------------------------------------
// Raw container
// ---------------------------------------------------------------------------

/// One sealed block as stored on disk.
#[derive(Debug, Clone)]
pub struct EncryptedBlock {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

/// A store file split into its parts, nothing decrypted yet.
///
/// Keeps the original header bytes so block authentication runs over
/// exactly what was on disk.
#[derive(Debug)]
pub struct RawStore {
    pub header: StoreHeader,
    pub header_bytes: [u8; HEADER_LEN],
    pub key_check: EncryptedBlock,
    pub blocks: Vec<EncryptedBlock>,
}

/// Read a store file from disk and split it into blocks.
pub fn read_store(path: &Path) -> Result<RawStore> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CredVaultError::StoreNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    parse_store(&data)
}

/// Split raw store bytes into header and blocks.
pub fn parse_store(data: &[u8]) -> Result<RawStore> {
    let header = StoreHeader::parse(data)?;
    let mut header_bytes = [0u8; HEADER_LEN];
    header_bytes.copy_from_slice(&data[..HEADER_LEN]);

    let mut pos = HEADER_LEN;
    let key_check = next_block(data, &mut pos)?;

    // Never trust record_count for an allocation size.
    let max_blocks = (data.len() - pos) / (BLOCK_OVERHEAD + TAG_LEN);
    let mut blocks = Vec::with_capacity((header.record_count as usize).min(max_blocks));
    for _ in 0..header.record_count {
        blocks.push(next_block(data, &mut pos)?);
    }

    if pos != data.len() {
        tracing::debug!(trailing = data.len() - pos, "store file has trailing bytes");
        return Err(CredVaultError::AuthenticationFailed);
    }

    Ok(RawStore {
        header,
        header_bytes,
        key_check,
        blocks,
    })
}

fn next_block(data: &[u8], pos: &mut usize) -> Result<EncryptedBlock> {
    let frame = data
        .get(*pos..*pos + BLOCK_OVERHEAD)
        .ok_or(CredVaultError::AuthenticationFailed)?;
    let len = read_u32(frame, 0) as usize;
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&frame[4..]);

    let start = *pos + BLOCK_OVERHEAD;
    let ciphertext = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or(CredVaultError::AuthenticationFailed)?
        .to_vec();

    *pos = start + len;
    Ok(EncryptedBlock { nonce, ciphertext })
}

// ---------------------------------------------------------------------------
// Sealing and opening
// ---------------------------------------------------------------------------

fn block_aad(header_bytes: &[u8; HEADER_LEN], index: u32) -> [u8; HEADER_LEN + 4] {
    let mut aad = [0u8; HEADER_LEN + 4];
    aad[..HEADER_LEN].copy_from_slice(header_bytes);
    aad[HEADER_LEN..].copy_from_slice(&index.to_le_bytes());
    aad
}

fn block_nonce(counter: u64, suffix: &[u8; 4]) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..8].copy_from_slice(&counter.to_le_bytes());
    nonce[8..].copy_from_slice(suffix);
    nonce
}

/// Frame `payload` as `[len: u32][payload][zeros]`, 64-byte aligned.
fn pad(payload: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        CredVaultError::MalformedRecord(format!("record of {} bytes is too large", payload.len()))
    })?;
    let framed = 4 + payload.len();
    let padded = framed.div_ceil(BLOCK_ALIGN) * BLOCK_ALIGN;

    let mut buf = Zeroizing::new(Vec::with_capacity(padded));
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(payload);
    buf.resize(padded, 0);
    Ok(buf)
}

fn unpad(plaintext: &[u8]) -> Result<&[u8]> {
    if plaintext.len() < 4 {
        return Err(CredVaultError::MalformedRecord("block shorter than its length prefix".into()));
    }
    let len = read_u32(plaintext, 0) as usize;
    plaintext.get(4..4 + len).ok_or_else(|| {
        CredVaultError::MalformedRecord(format!("padded length {len} exceeds block size"))
    })
}

/// Serialize and encrypt `index` into a complete store image.
///
/// Returns the header that was written (with the advanced nonce counter
/// and new record count) together with the file bytes.
pub fn seal(
    previous: &StoreHeader,
    index: &AccountIndex,
    block_key: &MasterKey,
) -> Result<(StoreHeader, Vec<u8>)> {
    let record_count = u32::try_from(index.len())
        .map_err(|_| CredVaultError::EncryptionFailed("too many accounts".into()))?;
    let first_nonce = previous.nonce_counter;
    let nonce_counter = first_nonce
        .checked_add(u64::from(record_count) + 1)
        .ok_or_else(|| CredVaultError::EncryptionFailed("nonce counter exhausted".into()))?;

    let header = StoreHeader {
        nonce_counter,
        record_count,
        ..previous.clone()
    };
    let header_bytes = header.to_bytes();

    let mut suffix = [0u8; 4];
    rand::rng().fill_bytes(&mut suffix);

    let mut out = Vec::with_capacity(HEADER_LEN + (index.len() + 1) * (BLOCK_OVERHEAD + BLOCK_ALIGN + TAG_LEN));
    out.extend_from_slice(&header_bytes);

    let mut plaintexts = Vec::with_capacity(index.len() + 1);
    plaintexts.push(pad(KEY_CHECK)?);
    for account in index.values() {
        plaintexts.push(pad(&record::encode(account)?)?);
    }

    for (i, plaintext) in plaintexts.iter().enumerate() {
        let position = i as u32;
        let nonce = block_nonce(first_nonce + u64::from(position), &suffix);
        let ciphertext = encrypt(
            block_key.as_bytes(),
            &nonce,
            plaintext,
            &block_aad(&header_bytes, position),
        )?;
        out.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
    }

    Ok((header, out))
}

fn open_block(
    raw: &RawStore,
    position: u32,
    block: &EncryptedBlock,
    block_key: &MasterKey,
) -> Result<Zeroizing<Vec<u8>>> {
    let plaintext = decrypt(
        block_key.as_bytes(),
        &block.nonce,
        &block.ciphertext,
        &block_aad(&raw.header_bytes, position),
    )?;
    Ok(Zeroizing::new(plaintext))
}

/// Verify the key-check block and decrypt every record into an index.
pub fn decrypt_index(raw: &RawStore, block_key: &MasterKey) -> Result<AccountIndex> {
    let check = open_block(raw, 0, &raw.key_check, block_key)?;
    if unpad(&check)? != KEY_CHECK {
        return Err(CredVaultError::AuthenticationFailed);
    }

    let mut index = BTreeMap::new();
    for (i, block) in raw.blocks.iter().enumerate() {
        let plaintext = open_block(raw, i as u32 + 1, block, block_key)?;
        let account = record::decode(unpad(&plaintext)?)?;
        if account.name.is_empty() {
            return Err(CredVaultError::MalformedRecord("empty account name".into()));
        }
        if index.contains_key(&account.name) {
            return Err(CredVaultError::MalformedRecord(format!(
                "account '{}' appears twice",
                account.name
            )));
        }
        index.insert(account.name.clone(), account);
    }

    Ok(index)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A store that has been read, authenticated, and decrypted.
#[derive(Debug)]
pub struct OpenedStore {
    pub header: StoreHeader,
    pub block_key: MasterKey,
    pub index: AccountIndex,
}

/// Create a new, empty store at `path`.
///
/// Generates a fresh salt, derives the key, and writes the header plus
/// key-check block.  The caller is expected to hold the store lock.
pub fn create(path: &Path, passphrase: &[u8], kdf: &Argon2Params) -> Result<OpenedStore> {
    if path.exists() {
        return Err(CredVaultError::StoreAlreadyExists(path.to_path_buf()));
    }

    let salt = generate_salt();
    let master_key = derive_key_with_params(passphrase, &salt, kdf)?;
    let block_key = master_key.derive_block_key()?;
    drop(master_key);

    let index = AccountIndex::new();
    let header = persist(path, &StoreHeader::new(salt, *kdf), &index, &block_key)?;
    tracing::debug!(store = %path.display(), "created store");

    Ok(OpenedStore {
        header,
        block_key,
        index,
    })
}

/// Read, authenticate, and decrypt the store at `path`.
pub fn open(path: &Path, passphrase: &[u8]) -> Result<OpenedStore> {
    let raw = read_store(path)?;
    let master_key = derive_key_with_params(passphrase, &raw.header.salt, &raw.header.kdf)?;
    let block_key = master_key.derive_block_key()?;
    drop(master_key);

    let index = decrypt_index(&raw, &block_key)?;
    tracing::debug!(store = %path.display(), accounts = index.len(), "opened store");

    Ok(OpenedStore {
        header: raw.header,
        block_key,
        index,
    })
}

/// Re-read the store at `path` with an already-derived block key.
///
/// Used by an open session to pick up writes made by other handles.
pub fn reload(path: &Path, block_key: &MasterKey) -> Result<(StoreHeader, AccountIndex)> {
    let raw = read_store(path)?;
    let index = decrypt_index(&raw, block_key)?;
    Ok((raw.header, index))
}

/// Encrypt `index` and atomically replace the store at `path`.
///
/// Returns the header that is now on disk.
pub fn persist(
    path: &Path,
    previous: &StoreHeader,
    index: &AccountIndex,
    block_key: &MasterKey,
) -> Result<StoreHeader> {
    let (header, bytes) = seal(previous, index, block_key)?;
    write_atomic(path, &bytes)?;
    tracing::debug!(
        store = %path.display(),
        accounts = header.record_count,
        bytes = bytes.len(),
        "persisted store"
    );
    Ok(header)
}

/// Temp file used while replacing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

/// Write `bytes` to `path` so readers only ever see the old or the new
/// file.
///
/// 1. Write and fsync a temp file in the same directory.
/// 2. Rename it over `path` (atomic on the same filesystem).
/// 3. Fsync the directory so the rename itself is durable.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = temp_path(path);

    let written = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp_path)?;

        // On Unix, restrict permissions to owner-only read/write.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = written {
        if tmp_path.is_file() {
            let _ = fs::remove_file(&tmp_path);
        }
        return Err(e.into());
    }

    #[cfg(unix)]
    {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
