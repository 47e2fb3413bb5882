//! Integration tests for the CredVault account store.

use std::fs;
use std::time::Duration;

use credvault::crypto::Argon2Params;
use credvault::errors::CredVaultError;
use credvault::vault::lock::{self, LockMode};
use credvault::vault::{AccountStore, LockPolicy, MessageId, StoreOptions};
use tempfile::TempDir;

fn fast_options() -> StoreOptions {
    StoreOptions {
        argon2: Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        },
        lock: LockPolicy {
            timeout: Duration::from_millis(300),
            poll_interval: Duration::from_millis(10),
        },
    }
}

/// Helper: a fresh temp dir and a store path inside it.
fn store_path() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("s.db");
    (dir, path)
}

fn created(path: &std::path::Path, passphrase: &[u8]) -> AccountStore {
    let mut store = AccountStore::new(fast_options());
    store.create(path, passphrase).expect("create store");
    store
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn create_add_close_and_reopen() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    store.add_account("github", "alice", "p@ss").unwrap();
    store.close();
    assert!(!store.is_open());

    let mut reopened = AccountStore::new(fast_options());
    reopened.open(&path, b"pw").unwrap();
    assert_eq!(
        reopened.read_message("github", MessageId::Password).unwrap().as_str(),
        "p@ss"
    );
    assert_eq!(
        reopened.read_message("github", MessageId::Username).unwrap().as_str(),
        "alice"
    );
    assert_eq!(reopened.account_count().unwrap(), 1);
}

#[test]
fn create_refuses_existing_path() {
    let (_dir, path) = store_path();
    fs::write(&path, b"something else").unwrap();

    let mut store = AccountStore::new(fast_options());
    let result = store.create(&path, b"pw");
    assert!(matches!(result, Err(CredVaultError::StoreAlreadyExists(_))));
    assert_eq!(fs::read(&path).unwrap(), b"something else");
}

#[test]
fn open_missing_store_fails() {
    let (_dir, path) = store_path();
    let mut store = AccountStore::new(fast_options());
    assert!(matches!(
        store.open(&path, b"pw"),
        Err(CredVaultError::StoreNotFound(_))
    ));
    assert!(!store.is_open());
}

#[test]
fn wrong_passphrase_is_rejected_even_for_empty_store() {
    let (_dir, path) = store_path();
    drop(created(&path, b"right"));

    let mut store = AccountStore::new(fast_options());
    let result = store.open(&path, b"wrong");
    assert!(matches!(result, Err(CredVaultError::AuthenticationFailed)));
    assert!(!store.is_open());
}

#[test]
fn open_rejects_foreign_file() {
    let (_dir, path) = store_path();
    fs::write(&path, vec![0u8; 128]).unwrap();

    let mut store = AccountStore::new(fast_options());
    assert!(matches!(
        store.open(&path, b"pw"),
        Err(CredVaultError::UnsupportedFormat(_))
    ));
}

// ---------------------------------------------------------------------------
// Account operations
// ---------------------------------------------------------------------------

#[test]
fn duplicate_add_keeps_first_record() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    store.add_account("github", "alice", "p@ss").unwrap();

    let result = store.add_account("github", "bob", "other");
    assert!(matches!(result, Err(CredVaultError::DuplicateAccount(_))));
    assert_eq!(store.account_count().unwrap(), 1);
    assert_eq!(
        store.read_message("github", MessageId::Username).unwrap().as_str(),
        "alice"
    );
}

#[test]
fn modify_replaces_both_fields() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    store.add_account("github", "alice", "p@ss").unwrap();
    store.modify_account("github", "alice2", "newpass").unwrap();

    let record = store.get_account("github").unwrap();
    assert_eq!(record.username, "alice2");
    assert_eq!(record.secret, "newpass");
}

#[test]
fn modify_and_delete_missing_account_fail() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    assert!(matches!(
        store.modify_account("nope", "u", "p"),
        Err(CredVaultError::AccountNotFound(_))
    ));
    assert!(matches!(
        store.delete_account("nope"),
        Err(CredVaultError::AccountNotFound(_))
    ));
}

#[test]
fn delete_then_read_is_not_found() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    store.add_account("github", "alice", "p@ss").unwrap();
    store.add_account("gitlab", "alice", "x").unwrap();
    store.delete_account("github").unwrap();

    assert!(matches!(
        store.read_message("github", MessageId::Password),
        Err(CredVaultError::AccountNotFound(_))
    ));
    assert_eq!(store.account_names().unwrap(), vec!["gitlab".to_string()]);
}

#[test]
fn empty_values_and_unusual_names_round_trip() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    let long = "x".repeat(1_000);
    store.add_account("bank | joint \u{1F511}", "", &long).unwrap();

    let mut reopened = AccountStore::new(fast_options());
    reopened.open(&path, b"pw").unwrap();
    let record = reopened.get_account("bank | joint \u{1F511}").unwrap();
    assert_eq!(record.username, "");
    assert_eq!(record.secret, long);
}

#[test]
fn search_matches_substrings() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    for name in ["github", "gitlab", "bank"] {
        store.add_account(name, "u", "p").unwrap();
    }

    assert_eq!(
        store.search_accounts("git").unwrap(),
        vec!["github".to_string(), "gitlab".to_string()]
    );
    assert_eq!(store.search_accounts("").unwrap().len(), 3);
    let found = store.find_accounts("ban").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "bank");
}

// ---------------------------------------------------------------------------
// Persistence and concurrency
// ---------------------------------------------------------------------------

#[test]
fn every_write_advances_nonce_counter() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    let first = store.header().unwrap().nonce_counter;
    store.add_account("a", "u", "p").unwrap();
    let second = store.header().unwrap().nonce_counter;
    store.modify_account("a", "u", "q").unwrap();
    let third = store.header().unwrap().nonce_counter;
    assert!(second > first);
    assert!(third > second);
}

#[test]
fn two_sessions_see_each_others_writes() {
    let (_dir, path) = store_path();
    let mut first = created(&path, b"pw");
    let mut second = AccountStore::new(fast_options());
    second.open(&path, b"pw").unwrap();

    first.add_account("github", "alice", "p@ss").unwrap();
    second.add_account("gitlab", "bob", "x").unwrap();

    assert_eq!(first.account_names().unwrap().len(), 2);
    assert_eq!(
        second.read_message("github", MessageId::Password).unwrap().as_str(),
        "p@ss"
    );
}

#[test]
fn writer_times_out_while_lock_is_held() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");

    let held = lock::acquire(&path, LockMode::Exclusive, &LockPolicy::default()).unwrap();
    let result = store.add_account("github", "alice", "p@ss");
    assert!(matches!(result, Err(CredVaultError::LockTimeout(_))));
    drop(held);

    assert_eq!(store.account_count().unwrap(), 0);
    store.add_account("github", "alice", "p@ss").unwrap();
    assert_eq!(store.account_count().unwrap(), 1);
}

#[test]
fn failed_write_leaves_store_unchanged() {
    let (dir, path) = store_path();
    let mut store = created(&path, b"pw");
    store.add_account("github", "alice", "p@ss").unwrap();
    let before = fs::read(&path).unwrap();

    // A directory where the temp file should go makes the write fail.
    fs::create_dir(dir.path().join(".s.db.tmp")).unwrap();
    assert!(store.add_account("gitlab", "bob", "x").is_err());

    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(store.account_names().unwrap(), vec!["github".to_string()]);
}

#[test]
fn tampered_file_fails_authentication() {
    let (_dir, path) = store_path();
    let mut store = created(&path, b"pw");
    store.add_account("github", "alice", "p@ss").unwrap();
    store.close();

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    fs::write(&path, bytes).unwrap();

    let mut reopened = AccountStore::new(fast_options());
    assert!(matches!(
        reopened.open(&path, b"pw"),
        Err(CredVaultError::AuthenticationFailed)
    ));
}
