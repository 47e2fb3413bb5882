//! Account store sessions.
//!
//! `AccountStore` is an explicit session object: it starts `Closed`,
//! becomes `Open` after `create` or `open`, and returns to `Closed` on
//! `close` or drop.  While open it holds the store path, the derived
//! block key, and the decrypted account index.
//!
//! Every operation re-reads the file under the store lock before
//! acting, so two sessions on the same file never lose each other's
//! updates.  Mutations edit a copy of the index, persist it, and only
//! then swap it in: a failed write leaves both the file and the session
//! exactly as they were.

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::format::{self, OpenedStore, StoreHeader};
use super::lock::{self, LockMode, LockPolicy};
use super::record::{AccountIndex, AccountRecord};
use crate::crypto::{Argon2Params, MasterKey};
use crate::errors::{CredVaultError, Result};

/// Which field of an account `read_message` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageId {
    /// The stored password / secret (id 0).
    Password,
    /// The account's username (id 1).
    Username,
}

impl TryFrom<u32> for MessageId {
    type Error = CredVaultError;

    fn try_from(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Self::Password),
            1 => Ok(Self::Username),
            other => Err(CredVaultError::InvalidMessageId(other)),
        }
    }
}

impl From<MessageId> for u32 {
    fn from(id: MessageId) -> Self {
        match id {
            MessageId::Password => 0,
            MessageId::Username => 1,
        }
    }
}

/// Tunables for a session: KDF cost for new stores and lock waiting.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub argon2: Argon2Params,
    pub lock: LockPolicy,
}

/// State kept while a store is open.
struct OpenSession {
    path: PathBuf,
    header: StoreHeader,
    block_key: MasterKey,
    index: AccountIndex,
}

/// A session over one store file.
pub struct AccountStore {
    options: StoreOptions,
    session: Option<OpenSession>,
}

impl AccountStore {
    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// A closed session.
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            session: None,
        }
    }

    /// Create a new store file at `path` and open it.
    ///
    /// Fails with `StoreAlreadyExists` if anything is already at `path`.
    /// A session that was already open is closed first.
    pub fn create(&mut self, path: &Path, passphrase: &[u8]) -> Result<()> {
        self.close();
        let _guard = lock::acquire(path, LockMode::Exclusive, &self.options.lock)?;
        let opened = format::create(path, passphrase, &self.options.argon2)?;
        tracing::info!(store = %path.display(), "created password store");
        self.attach(path, opened);
        Ok(())
    }

    /// Open an existing store, verifying the passphrase.
    ///
    /// A session that was already open is closed first, even if this
    /// open fails.
    pub fn open(&mut self, path: &Path, passphrase: &[u8]) -> Result<()> {
        self.close();
        if !path.exists() {
            return Err(CredVaultError::StoreNotFound(path.to_path_buf()));
        }
        let _guard = lock::acquire(path, LockMode::Shared, &self.options.lock)?;
        let opened = format::open(path, passphrase)?;
        self.attach(path, opened);
        Ok(())
    }

    /// Close the session, wiping the key and decrypted accounts.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            // Records zeroize themselves on drop; clearing here makes
            // it happen now rather than whenever the map is freed.
            session.index.clear();
            tracing::debug!(store = %session.path.display(), "closed store session");
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Path of the open store.
    pub fn path(&self) -> Result<&Path> {
        Ok(&self.session()?.path)
    }

    /// Header of the open store as of the last read or write.
    pub fn header(&self) -> Result<&StoreHeader> {
        Ok(&self.session()?.header)
    }

    fn attach(&mut self, path: &Path, opened: OpenedStore) {
        self.session = Some(OpenSession {
            path: path.to_path_buf(),
            header: opened.header,
            block_key: opened.block_key,
            index: opened.index,
        });
    }

    fn session(&self) -> Result<&OpenSession> {
        self.session.as_ref().ok_or(CredVaultError::NotOpen)
    }

    fn session_mut(&mut self) -> Result<&mut OpenSession> {
        self.session.as_mut().ok_or(CredVaultError::NotOpen)
    }

    // ------------------------------------------------------------------
    // Account operations
    // ------------------------------------------------------------------

    /// Add a new account.
    pub fn add_account(&mut self, name: &str, username: &str, password: &str) -> Result<()> {
        validate_account_name(name)?;
        self.mutate(|index| {
            if index.contains_key(name) {
                return Err(CredVaultError::DuplicateAccount(name.to_string()));
            }
            index.insert(name.to_string(), AccountRecord::new(name, username, password));
            Ok(())
        })?;
        tracing::info!(account = name, "added account");
        Ok(())
    }

    /// Replace the username and password of an existing account.
    pub fn modify_account(&mut self, name: &str, username: &str, password: &str) -> Result<()> {
        self.mutate(|index| {
            let record = index
                .get_mut(name)
                .ok_or_else(|| CredVaultError::AccountNotFound(name.to_string()))?;
            *record = AccountRecord::new(name, username, password);
            Ok(())
        })?;
        tracing::info!(account = name, "modified account");
        Ok(())
    }

    /// Remove an account.
    pub fn delete_account(&mut self, name: &str) -> Result<()> {
        self.mutate(|index| {
            index
                .remove(name)
                .map(drop)
                .ok_or_else(|| CredVaultError::AccountNotFound(name.to_string()))
        })?;
        tracing::info!(account = name, "deleted account");
        Ok(())
    }

    /// Read one field of an account.
    pub fn read_message(&mut self, name: &str, message_id: MessageId) -> Result<Zeroizing<String>> {
        self.refresh()?;
        let record = self.record(name)?;
        let message = match message_id {
            MessageId::Password => &record.secret,
            MessageId::Username => &record.username,
        };
        Ok(Zeroizing::new(message.clone()))
    }

    /// A copy of a whole account record.
    pub fn get_account(&mut self, name: &str) -> Result<AccountRecord> {
        self.refresh()?;
        self.record(name).cloned()
    }

    /// All account names, sorted.
    pub fn account_names(&mut self) -> Result<Vec<String>> {
        self.refresh()?;
        Ok(self.session()?.index.keys().cloned().collect())
    }

    /// Account names containing `query`, sorted.  An empty query
    /// matches everything.
    pub fn search_accounts(&mut self, query: &str) -> Result<Vec<String>> {
        self.refresh()?;
        Ok(self
            .session()?
            .index
            .keys()
            .filter(|name| name.contains(query))
            .cloned()
            .collect())
    }

    /// Records whose name contains `query`, sorted by name.
    pub fn find_accounts(&mut self, query: &str) -> Result<Vec<AccountRecord>> {
        self.refresh()?;
        Ok(self
            .session()?
            .index
            .values()
            .filter(|record| record.name.contains(query))
            .cloned()
            .collect())
    }

    /// Number of accounts as of the last read.
    pub fn account_count(&self) -> Result<usize> {
        Ok(self.session()?.index.len())
    }

    fn record(&self, name: &str) -> Result<&AccountRecord> {
        self.session()?
            .index
            .get(name)
            .ok_or_else(|| CredVaultError::AccountNotFound(name.to_string()))
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Reload the index from disk under a shared lock.
    fn refresh(&mut self) -> Result<()> {
        let policy = self.options.lock;
        let session = self.session_mut()?;
        let _guard = lock::acquire(&session.path, LockMode::Shared, &policy)?;
        let (header, index) = format::reload(&session.path, &session.block_key)?;
        session.header = header;
        session.index = index;
        Ok(())
    }

    /// Reload, apply `change` to a copy of the index, persist, swap in.
    ///
    /// The exclusive lock is held for the whole read-modify-write cycle.
    fn mutate<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut AccountIndex) -> Result<()>,
    {
        let policy = self.options.lock;
        let session = self.session_mut()?;
        let _guard = lock::acquire(&session.path, LockMode::Exclusive, &policy)?;

        let (header, mut index) = format::reload(&session.path, &session.block_key)?;
        change(&mut index)?;
        let written = format::persist(&session.path, &header, &index, &session.block_key)?;

        session.header = written;
        session.index = index;
        Ok(())
    }
}

impl Drop for AccountStore {
    fn drop(&mut self) {
        self.close();
    }
}

/// Account names must be non-empty.  Anything else is allowed: the
/// codec is length-prefixed, so there are no reserved characters.
fn validate_account_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CredVaultError::InvalidInput(
            "account name cannot be empty".into(),
        ));
    }
    Ok(())
}
