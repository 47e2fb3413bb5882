//! Stateless, path + passphrase operations.
//!
//! Each call opens its own `AccountStore` session, performs one
//! operation, and closes the session again.  This is the surface the C
//! ABI in `ffi` wraps; it owns no logic beyond that plumbing.

use std::path::Path;

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::Result;
use crate::vault::{AccountStore, MessageId};

fn open(path: &Path, passphrase: &[u8], settings: &Settings) -> Result<AccountStore> {
    let mut store = AccountStore::new(settings.store_options());
    store.open(path, passphrase)?;
    Ok(store)
}

/// Create a new, empty password file.
pub fn create_password_file(path: &Path, passphrase: &[u8], settings: &Settings) -> Result<()> {
    let mut store = AccountStore::new(settings.store_options());
    store.create(path, passphrase)
}

pub fn add_account(
    path: &Path,
    passphrase: &[u8],
    account: &str,
    username: &str,
    password: &str,
    settings: &Settings,
) -> Result<()> {
    open(path, passphrase, settings)?.add_account(account, username, password)
}

pub fn modify_account(
    path: &Path,
    passphrase: &[u8],
    account: &str,
    username: &str,
    password: &str,
    settings: &Settings,
) -> Result<()> {
    open(path, passphrase, settings)?.modify_account(account, username, password)
}

pub fn delete_account(path: &Path, passphrase: &[u8], account: &str, settings: &Settings) -> Result<()> {
    open(path, passphrase, settings)?.delete_account(account)
}

/// Read one field of an account; `message_id` 0 is the password, 1 the
/// username.
pub fn read_message(
    path: &Path,
    passphrase: &[u8],
    account: &str,
    message_id: u32,
    settings: &Settings,
) -> Result<Zeroizing<String>> {
    let message_id = MessageId::try_from(message_id)?;
    open(path, passphrase, settings)?.read_message(account, message_id)
}

/// All account names in the file, sorted.
pub fn list_accounts(path: &Path, passphrase: &[u8], settings: &Settings) -> Result<Vec<String>> {
    open(path, passphrase, settings)?.account_names()
}
