//! `credvault delete`: Remove an account from the store.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::{CredVaultError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, account: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete account '{account}'?"))
            .default(false)
            .interact()
            .map_err(|e| CredVaultError::InvalidInput(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Err(CredVaultError::UserCancelled);
        }
    }

    let mut store = open_store(cli)?;
    store.delete_account(account)?;

    output::success(&format!("Deleted account '{account}'"));

    Ok(())
}
