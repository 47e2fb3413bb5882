//! `credvault init`: Create a new, empty password store.

use crate::cli::output;
use crate::cli::{load_settings, prompt_new_passphrase, store_path, Cli};
use crate::errors::{CredVaultError, Result};
use crate::vault::AccountStore;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings()?;
    let path = store_path(cli, &settings)?;

    if path.exists() {
        output::tip("Use `credvault add` to add accounts to the existing store.");
        return Err(CredVaultError::StoreAlreadyExists(path));
    }

    let passphrase = prompt_new_passphrase()?;
    let mut store = AccountStore::new(settings.store_options());
    store.create(&path, passphrase.as_bytes())?;

    output::success(&format!("Password store created at {}", path.display()));
    output::tip("Run `credvault add <ACCOUNT>` to store a password.");

    Ok(())
}
