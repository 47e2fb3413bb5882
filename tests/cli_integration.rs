//! Integration tests for the CredVault CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.  The
//! passphrase comes from `CREDVAULT_PASSPHRASE` and field values from
//! flags, so nothing waits on an interactive prompt.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const PASSPHRASE: &str = "correct horse battery";

/// Helper: a credvault command running in `dir` with cheap KDF settings.
fn credvault(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("credvault").expect("binary should exist");
    cmd.current_dir(dir.path())
        .env("CREDVAULT_PASSPHRASE", PASSPHRASE)
        .env_remove("CREDVAULT_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// A temp dir holding a fast config and an initialised store.
fn initialised() -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child(".credvault.toml")
        .write_str(
            "store_file = \"vault.cvlt\"\n\
             argon2_memory_kib = 8192\n\
             argon2_iterations = 1\n\
             argon2_parallelism = 1\n",
        )
        .unwrap();
    credvault(&dir).arg("init").assert().success();
    dir
}

#[test]
fn help_flag_shows_usage() {
    #[allow(deprecated)]
    Command::cargo_bin("credvault")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted account and password store"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("modify"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn no_args_shows_usage() {
    #[allow(deprecated)]
    Command::cargo_bin("credvault")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn init_creates_store_file() {
    let dir = initialised();
    dir.child("vault.cvlt").assert(predicate::path::exists());
}

#[test]
fn init_twice_fails() {
    let dir = initialised();
    credvault(&dir).arg("init").assert().failure();
}

#[test]
fn get_on_missing_store_fails() {
    let dir = TempDir::new().unwrap();
    credvault(&dir)
        .args(["--file", "absent.cvlt", "get", "github"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("credvault init"));
}

#[test]
fn add_get_modify_delete() {
    let dir = initialised();

    credvault(&dir)
        .args(["add", "github", "-u", "alice", "-p", "p@ss"])
        .assert()
        .success();

    credvault(&dir)
        .args(["get", "github"])
        .assert()
        .success()
        .stdout(predicate::str::contains("p@ss"));

    credvault(&dir)
        .args(["get", "github", "--username"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"));

    credvault(&dir)
        .args(["modify", "github", "-u", "alice", "-p", "newpass"])
        .assert()
        .success();

    credvault(&dir)
        .args(["get", "github"])
        .assert()
        .success()
        .stdout(predicate::str::contains("newpass"));

    credvault(&dir)
        .args(["delete", "github", "--force"])
        .assert()
        .success();

    credvault(&dir).args(["get", "github"]).assert().failure();
}

#[test]
fn duplicate_add_fails() {
    let dir = initialised();
    credvault(&dir)
        .args(["add", "github", "-u", "alice", "-p", "x"])
        .assert()
        .success();
    credvault(&dir)
        .args(["add", "github", "-u", "bob", "-p", "y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("github"));
}

#[test]
fn wrong_passphrase_fails() {
    let dir = initialised();
    credvault(&dir)
        .env("CREDVAULT_PASSPHRASE", "not the passphrase")
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn list_shows_names_but_never_passwords() {
    let dir = initialised();
    for (account, password) in [("github", "secret-one"), ("gitlab", "secret-two"), ("bank", "secret-three")] {
        credvault(&dir)
            .args(["add", account, "-u", "alice", "-p", password])
            .assert()
            .success();
    }

    credvault(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("github"))
        .stdout(predicate::str::contains("bank"))
        .stdout(predicate::str::contains("secret").not());

    credvault(&dir)
        .args(["list", "--search", "git"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gitlab"))
        .stdout(predicate::str::contains("bank").not());
}

#[test]
fn username_can_be_piped_on_stdin() {
    let dir = initialised();
    credvault(&dir)
        .args(["add", "github", "-p", "p@ss"])
        .write_stdin("piped-user\n")
        .assert()
        .success();

    credvault(&dir)
        .args(["get", "github", "--username"])
        .assert()
        .success()
        .stdout(predicate::str::contains("piped-user"));
}
